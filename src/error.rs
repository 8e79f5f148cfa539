//! Error taxonomy for the controller and background tasks.

use thiserror::Error;

/// Problems with user input, detected synchronously before any background
/// work is submitted. Recoverable: the user corrects the field and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please choose an existing image file")]
    InvalidImagePath,
    #[error("Please choose where to save the result")]
    MissingSavePath,
}

/// Failures reported by background tasks. Each variant carries the
/// underlying cause text so the user-facing message never loses it.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// Engine initialization failed. Terminal for this session; the run
    /// action stays disabled until the application is restarted.
    #[error("The OCR engine could not be started: {0}")]
    EngineInit(String),
    /// Recognition failed on the selected image. The user may retry.
    #[error("Text recognition failed: {0}")]
    Recognition(String),
    /// Recognition succeeded but the result file could not be written.
    /// Must not read as success: nothing was saved.
    #[error("The recognized text was NOT saved: {0}")]
    OutputWrite(String),
}
