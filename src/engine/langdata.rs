//! Trained-data management for Tesseract.
//!
//! Handles downloading, verifying, and caching per-language `.traineddata`
//! files so the engine can be initialized without any manual setup, the same
//! way the engine fetches its weights on first use.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Where per-language files are fetched from. tessdata_fast is the small
/// integer-quantized distribution, a few MB per language.
const DOWNLOAD_BASE_URL: &str = "https://github.com/tesseract-ocr/tessdata_fast/raw/main";

/// Sanity bounds for a downloaded file, in bytes. The smallest shipped
/// languages are a few hundred KB; the largest scripts stay well under 50 MB.
const TRAINEDDATA_SIZE_RANGE: (u64, u64) = (100_000, 50_000_000);

/// Manifest tracking downloaded trained data.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DataManifest {
    pub entries: Vec<DataEntry>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DataEntry {
    pub language: String,
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Downloads and caches `.traineddata` files in a per-user data directory.
pub struct LanguageDataManager {
    data_dir: PathBuf,
}

impl LanguageDataManager {
    /// Create a manager rooted at the platform data directory.
    pub fn new() -> Result<Self> {
        let proj_dirs = directories::ProjectDirs::from("com", "textlift", "Textlift")
            .ok_or_else(|| anyhow::anyhow!("could not determine data directory"))?;
        let data_dir = proj_dirs.data_dir().join("tessdata");
        Self::with_dir(data_dir)
    }

    /// Create a manager rooted at a custom directory.
    pub fn with_dir(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {:?}", data_dir))?;
        Ok(Self { data_dir })
    }

    /// Directory holding the `.traineddata` files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the trained-data file for a language tag.
    pub fn traineddata_path(&self, language: &str) -> PathBuf {
        self.data_dir.join(format!("{}.traineddata", language))
    }

    /// Whether a language's trained data is present and plausibly intact.
    pub fn is_language_available(&self, language: &str) -> bool {
        let path = self.traineddata_path(language);
        match std::fs::metadata(&path) {
            Ok(meta) => {
                let (min, max) = TRAINEDDATA_SIZE_RANGE;
                meta.is_file() && meta.len() >= min && meta.len() <= max
            }
            Err(_) => false,
        }
    }

    /// Make sure a language's trained data is on disk, downloading it if
    /// missing. Returns the file path.
    pub fn ensure_language(&self, language: &str) -> Result<PathBuf> {
        validate_language_tag(language)?;

        let path = self.traineddata_path(language);
        if self.is_language_available(language) {
            debug!("trained data for '{}' already available at {:?}", language, path);
            return Ok(path);
        }

        info!("downloading trained data for language '{}'", language);
        self.download_language(language)?;
        Ok(path)
    }

    /// Download one language's trained data (blocking).
    fn download_language(&self, language: &str) -> Result<()> {
        let url = format!("{}/{}.traineddata", DOWNLOAD_BASE_URL, language);
        let path = self.traineddata_path(language);

        let rt = Runtime::new().context("failed to create tokio runtime")?;
        let sha256 = rt.block_on(self.download_file(&url, &path))?;

        if !self.is_language_available(language) {
            std::fs::remove_file(&path).ok();
            anyhow::bail!(
                "downloaded file for '{}' failed the size check; the language tag may be unknown",
                language
            );
        }

        self.record_download(language, &path, sha256)?;
        info!("trained data for '{}' ready at {:?}", language, path);
        Ok(())
    }

    /// Stream `url` into `path` through a temp file; returns the SHA-256 of
    /// the received bytes.
    async fn download_file(&self, url: &str, path: &Path) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            anyhow::bail!("download failed with status {}: {}", response.status(), url);
        }

        let total_size = response.content_length();
        debug!("download size: {:?} bytes", total_size);

        let temp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path)
            .with_context(|| format!("failed to create {:?}", temp_path))?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("error reading download stream")?;
            file.write_all(&chunk).context("failed to write to temp file")?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }
        debug!("downloaded {} bytes from {}", downloaded, url);

        file.flush().context("failed to flush temp file")?;
        drop(file);

        std::fs::rename(&temp_path, path)
            .context("failed to move downloaded file into place")?;

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Update the manifest after a successful download.
    fn record_download(&self, language: &str, path: &Path, sha256: String) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        let metadata = std::fs::metadata(path)?;

        let entry = DataEntry {
            language: language.to_string(),
            filename: format!("{}.traineddata", language),
            size_bytes: metadata.len(),
            sha256,
        };

        if let Some(existing) = manifest
            .entries
            .iter_mut()
            .find(|e| e.language == entry.language)
        {
            *existing = entry;
        } else {
            manifest.entries.push(entry);
        }

        self.save_manifest(&manifest)
    }

    pub fn load_manifest(&self) -> Result<DataManifest> {
        let manifest_path = self.data_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(DataManifest::default())
        }
    }

    pub fn save_manifest(&self, manifest: &DataManifest) -> Result<()> {
        let manifest_path = self.data_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }
}

/// Language tags become file names and URL segments; only accept the shapes
/// Tesseract actually uses (`eng`, `chi_sim`, `deu_latf`, ...).
fn validate_language_tag(language: &str) -> Result<()> {
    let valid = !language.is_empty()
        && language.len() <= 32
        && language
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        anyhow::bail!("'{}' is not a valid language tag", language);
    }
    Ok(())
}
