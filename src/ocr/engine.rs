//! Recognition engines.
//!
//! The orchestration in [`super::BatchRecognizer`] only needs the
//! [`RecognitionEngine`] trait; [`TesseractCli`] drives a locally installed
//! `tesseract` binary.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

use super::types::{OcrError, OcrProgress, Recognition};

/// A third-party recognition engine.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Prepare the engine for `language` (a tesseract language code such as `eng`).
    async fn load(&mut self, language: &str) -> Result<(), OcrError>;

    /// Recognize the text in one image.
    async fn recognize(
        &self,
        image: &Path,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<Recognition, OcrError>;

    /// Release whatever `load` acquired.
    async fn terminate(&mut self) -> Result<(), OcrError>;
}

/// Engine backed by the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: Option<String>,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            language: None,
        }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl RecognitionEngine for TesseractCli {
    async fn load(&mut self, language: &str) -> Result<(), OcrError> {
        let output = Command::new(&self.binary)
            .arg("--list-langs")
            .output()
            .await
            .map_err(|e| {
                OcrError::EngineUnavailable(format!("{}: {}", self.binary.display(), e))
            })?;

        // Older releases print the list on stderr.
        let listing = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let installed = language
            .split('+')
            .all(|lang| listing.lines().any(|line| line.trim() == lang));
        if !installed {
            return Err(OcrError::EngineUnavailable(format!(
                "language '{}' is not installed",
                language
            )));
        }

        debug!(language = %language, "Tesseract language loaded");
        self.language = Some(language.to_string());
        Ok(())
    }

    async fn recognize(
        &self,
        image: &Path,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<Recognition, OcrError> {
        let language = self.language.as_deref().ok_or(OcrError::NotLoaded)?;

        progress(OcrProgress::new("recognizing text", 0.0));

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", language, "--oem", "1"])
            .arg("tsv")
            .output()
            .await
            .map_err(|e| OcrError::Recognition {
                image: image.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(image = %image.display(), stderr = %stderr.trim(), "Tesseract failed");
            return Err(OcrError::Recognition {
                image: image.to_path_buf(),
                reason: stderr.trim().to_string(),
            });
        }

        let recognition = parse_tsv(&String::from_utf8_lossy(&output.stdout))?;
        progress(OcrProgress::new("recognizing text", 1.0));
        Ok(recognition)
    }

    async fn terminate(&mut self) -> Result<(), OcrError> {
        self.language = None;
        Ok(())
    }
}

/// Rebuild text and mean confidence from tesseract's TSV output.
///
/// Words on one line are joined by spaces, lines by newlines and blocks
/// by blank lines.
pub fn parse_tsv(tsv: &str) -> Result<Recognition, OcrError> {
    let mut lines = tsv.lines();
    match lines.next() {
        Some(header) if header.starts_with("level") => {}
        _ => return Err(OcrError::Output("missing TSV header".to_string())),
    }

    // (block, paragraph, line) -> words
    let mut text_lines: BTreeMap<(u32, u32, u32), Vec<String>> = BTreeMap::new();
    let mut confidence_sum = 0.0f32;
    let mut word_count = 0u32;

    for row in lines.filter(|row| !row.is_empty()) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            return Err(OcrError::Output(format!("short TSV row: {:?}", row)));
        }
        if cols[0] != "5" {
            continue;
        }

        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        let field = |i: usize| {
            cols[i]
                .parse::<u32>()
                .map_err(|_| OcrError::Output(format!("bad TSV field {:?}", cols[i])))
        };
        let conf: f32 = cols[10]
            .parse()
            .map_err(|_| OcrError::Output(format!("bad confidence {:?}", cols[10])))?;

        if conf >= 0.0 {
            confidence_sum += conf;
            word_count += 1;
        }
        text_lines
            .entry((field(2)?, field(3)?, field(4)?))
            .or_default()
            .push(word.to_string());
    }

    let mut text = String::new();
    let mut previous_block = None;
    for ((block, _, _), words) in &text_lines {
        match previous_block {
            Some(prev) if prev != *block => text.push_str("\n\n"),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(&words.join(" "));
        previous_block = Some(*block);
    }

    let confidence = if word_count == 0 {
        0.0
    } else {
        confidence_sum / word_count as f32
    };

    Ok(Recognition { text, confidence })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, line: u32, num: u32, conf: f32, text: &str) -> String {
        format!("5\t1\t{block}\t1\t{line}\t{num}\t0\t0\t10\t10\t{conf}\t{text}")
    }

    #[test]
    fn test_parse_tsv_lines_and_blocks() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word(1, 1, 1, 90.0, "Hello"),
            word(1, 1, 2, 80.0, "world"),
            word(1, 2, 1, 70.0, "again"),
            word(2, 1, 1, 60.0, "Footer"),
        ]
        .join("\n");

        let recognition = parse_tsv(&tsv).unwrap();
        assert_eq!(recognition.text, "Hello world\nagain\n\nFooter");
        assert!((recognition.confidence - 75.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_tsv_empty_page() {
        let recognition = parse_tsv(HEADER).unwrap();
        assert_eq!(recognition.text, "");
        assert_eq!(recognition.confidence, 0.0);
    }

    #[test]
    fn test_parse_tsv_rejects_garbage() {
        assert!(matches!(parse_tsv("not tsv"), Err(OcrError::Output(_))));

        let short = format!("{}\n5\t1\t1", HEADER);
        assert!(matches!(parse_tsv(&short), Err(OcrError::Output(_))));
    }

    #[tokio::test]
    async fn test_recognize_requires_loaded_language() {
        let engine = TesseractCli::default();
        let result = engine.recognize(Path::new("page.png"), &|_: OcrProgress| {}).await;
        assert!(matches!(result, Err(OcrError::NotLoaded)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let mut engine = TesseractCli::new("/nonexistent/glyphgate-tesseract");
        let result = engine.load("eng").await;
        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }
}
