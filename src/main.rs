//! Textlift - extract text from images into plain-text files.
//!
//! A small desktop tool: pick an image, run OCR on it in the background,
//! save the recognized lines to a file.

mod app;
mod controller;
mod engine;
mod error;
mod output;
mod task;
mod theme;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::engine::EngineConfig;

/// Textlift - image text extraction
#[derive(Parser, Debug)]
#[command(name = "textlift")]
#[command(about = "Pick an image, extract the text, save it to a file")]
struct Args {
    /// Recognition language (tesseract tag, may be given multiple times)
    #[arg(short, long = "language", default_values_t = [String::from("eng"), String::from("chi_sim")])]
    languages: Vec<String>,

    /// Override the trained-data cache directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// List languages installed for the local tesseract and exit
    #[arg(long)]
    list_languages: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    if args.list_languages {
        println!("Installed tesseract languages:");
        match rusty_tesseract::get_tesseract_langs() {
            Ok(langs) => {
                for lang in langs {
                    println!("  {}", lang);
                }
            }
            Err(e) => println!("  Could not query tesseract: {}", e),
        }
        return Ok(());
    }

    info!("Textlift starting...");

    let engine_config = EngineConfig {
        languages: args.languages,
        data_dir: args.data_dir,
    };

    if let Err(e) = app::run(engine_config) {
        tracing::error!("Window error: {}", e);
    }

    info!("Textlift shutdown complete");

    Ok(())
}
