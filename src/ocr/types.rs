//! OCR types.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Progress report from a recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrProgress {
    /// What the engine is doing, e.g. "recognizing text"
    pub status: String,
    /// Fraction complete, 0.0 to 1.0
    pub progress: f32,
}

impl OcrProgress {
    pub fn new(status: impl Into<String>, progress: f32) -> Self {
        Self {
            status: status.into(),
            progress: progress.clamp(0.0, 1.0),
        }
    }
}

/// Text recognized from a single image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognition {
    pub text: String,
    /// Mean word confidence, 0 to 100
    pub confidence: f32,
}

/// OCR error types
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("no language loaded")]
    NotLoaded,

    #[error("failed to recognize {}: {reason}", .image.display())]
    Recognition { image: PathBuf, reason: String },

    #[error("unreadable engine output: {0}")]
    Output(String),
}
