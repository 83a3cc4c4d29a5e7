//! OCR Module
//!
//! Batch text recognition on top of a pluggable recognition engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use glyphgate::ocr::{BatchRecognizer, TesseractCli};
//!
//! let mut batch = BatchRecognizer::new(TesseractCli::default());
//! let text = batch
//!     .recognize_batch(&images, "eng", |index, total, progress| {
//!         println!("[{}/{}] {} {:.0}%", index + 1, total, progress.status, progress.progress * 100.0);
//!     })
//!     .await?;
//! batch.terminate().await?;
//! ```

mod batch;
mod engine;
mod types;

pub use batch::{BatchRecognizer, BATCH_SEPARATOR};
pub use engine::{parse_tsv, RecognitionEngine, TesseractCli};
pub use types::{OcrError, OcrProgress, Recognition};
