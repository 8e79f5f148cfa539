//! OCR engine adapter.
//!
//! Wraps the external Tesseract engine behind a minimal interface: one-time
//! initialization (slow: may download trained data, probes the installed
//! binary) and blocking path-based recognition. The engine is a black box;
//! nothing here inspects pixels.

pub mod langdata;

use anyhow::{Context, Result};
use rusty_tesseract::{Args, Image};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

pub use langdata::LanguageDataManager;

/// One detected text line with its recognized string.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    /// Recognized text content.
    pub text: String,
    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
    /// Bounding box (x, y, width, height). Carried through for callers that
    /// want geometry; the save path ignores it.
    pub bounds: (u32, u32, u32, u32),
}

/// Path-based text recognition, behind a trait so the controller can be
/// exercised with a stub engine in tests.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image_path: &Path) -> Result<Vec<TextRegion>>;
}

/// Engine initialization settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tesseract language tags, e.g. `eng`, `chi_sim`.
    pub languages: Vec<String>,
    /// Override for the trained-data cache directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            languages: vec!["eng".to_string(), "chi_sim".to_string()],
            data_dir: None,
        }
    }
}

/// Tesseract-backed recognizer. Construction is the slow part; recognition
/// calls are serialized by the caller (one run at a time).
pub struct TesseractEngine {
    /// Combined language argument, e.g. `eng+chi_sim`.
    lang_arg: String,
}

impl TesseractEngine {
    /// One-time engine initialization: probe the installed binary, then make
    /// sure trained data for every requested language is on disk (fetching
    /// it over the network on first use). Safe to call once per process;
    /// failures are not retryable within the session.
    pub fn initialize(config: &EngineConfig) -> Result<Self> {
        anyhow::ensure!(!config.languages.is_empty(), "no languages requested");

        let version = rusty_tesseract::get_tesseract_version()
            .context("tesseract binary not found; install tesseract-ocr and make sure it is on PATH")?;
        info!("found tesseract: {}", version);

        let manager = match &config.data_dir {
            Some(dir) => LanguageDataManager::with_dir(dir.clone())?,
            None => LanguageDataManager::new()?,
        };

        for language in &config.languages {
            manager.ensure_language(language)?;
        }

        // Point tesseract at the managed trained data. Init runs exactly once,
        // before any recognition can start, so this is not racing anything.
        std::env::set_var("TESSDATA_PREFIX", manager.data_dir());

        let lang_arg = config.languages.join("+");
        info!("OCR engine ready (languages: {})", lang_arg);

        Ok(Self { lang_arg })
    }
}

impl TextRecognizer for TesseractEngine {
    /// Run recognition on the image at `image_path`. Blocking and CPU-bound;
    /// duration scales with image size. No partial results on failure.
    fn recognize(&self, image_path: &Path) -> Result<Vec<TextRegion>> {
        let start = Instant::now();

        let image = Image::from_path(image_path.to_string_lossy().as_ref())
            .with_context(|| format!("could not read image {:?}", image_path))?;

        let args = Args {
            lang: self.lang_arg.clone(),
            config_variables: HashMap::new(),
            dpi: Some(150),
            psm: Some(3),
            oem: Some(3),
        };

        let output = rusty_tesseract::image_to_data(&image, &args)
            .with_context(|| format!("recognition failed on {:?}", image_path))?;

        let words: Vec<WordRecord> = output
            .data
            .iter()
            .map(|d| WordRecord {
                block: d.block_num,
                paragraph: d.par_num,
                line: d.line_num,
                left: d.left,
                top: d.top,
                width: d.width,
                height: d.height,
                confidence: d.conf,
                text: d.text.clone(),
            })
            .collect();

        let regions = group_words_into_lines(&words);
        debug!(
            "recognized {} lines from {:?} in {:?}",
            regions.len(),
            image_path,
            start.elapsed()
        );

        Ok(regions)
    }
}

/// One word-level record from the engine's tabular output.
#[derive(Debug, Clone)]
struct WordRecord {
    block: i32,
    paragraph: i32,
    line: i32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    /// Percentage 0-100; structural (non-word) rows carry -1.
    confidence: f32,
    text: String,
}

/// Fold word records into line-level regions: words joined with single
/// spaces, mean word confidence, union bounding box. Line order is the
/// engine's output order.
fn group_words_into_lines(words: &[WordRecord]) -> Vec<TextRegion> {
    struct LineAccum {
        key: (i32, i32, i32),
        texts: Vec<String>,
        conf_sum: f32,
        min_x: i32,
        min_y: i32,
        max_right: i32,
        max_bottom: i32,
    }

    impl LineAccum {
        fn new(key: (i32, i32, i32), word: &WordRecord) -> Self {
            let mut accum = Self {
                key,
                texts: Vec::new(),
                conf_sum: 0.0,
                min_x: word.left,
                min_y: word.top,
                max_right: word.left + word.width,
                max_bottom: word.top + word.height,
            };
            accum.add(word);
            accum
        }

        fn add(&mut self, word: &WordRecord) {
            self.texts.push(word.text.trim().to_string());
            self.conf_sum += word.confidence;
            self.min_x = self.min_x.min(word.left);
            self.min_y = self.min_y.min(word.top);
            self.max_right = self.max_right.max(word.left + word.width);
            self.max_bottom = self.max_bottom.max(word.top + word.height);
        }
    }

    let mut lines: Vec<LineAccum> = Vec::new();

    for word in words {
        if word.confidence < 0.0 || word.text.trim().is_empty() {
            continue;
        }

        let key = (word.block, word.paragraph, word.line);
        match lines.last_mut() {
            Some(last) if last.key == key => last.add(word),
            _ => lines.push(LineAccum::new(key, word)),
        }
    }

    lines
        .into_iter()
        .map(|line| {
            let count = line.texts.len() as f32;
            let x = line.min_x.max(0) as u32;
            let y = line.min_y.max(0) as u32;
            TextRegion {
                text: line.texts.join(" "),
                confidence: (line.conf_sum / (count * 100.0)).clamp(0.0, 1.0),
                bounds: (
                    x,
                    y,
                    (line.max_right.max(0) as u32).saturating_sub(x),
                    (line.max_bottom.max(0) as u32).saturating_sub(y),
                ),
            }
        })
        .collect()
}
