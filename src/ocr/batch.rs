//! Sequential batch recognition.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::engine::RecognitionEngine;
use super::types::{OcrError, OcrProgress, Recognition};

/// Separator placed between the texts of consecutive images.
pub const BATCH_SEPARATOR: &str = "\n\n";

/// Runs images through one engine, reloading it only when the language
/// changes.
pub struct BatchRecognizer<E: RecognitionEngine> {
    engine: E,
    /// Language the engine currently has loaded
    loaded: Option<String>,
}

impl<E: RecognitionEngine> BatchRecognizer<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            loaded: None,
        }
    }

    /// The language currently loaded, if any.
    pub fn language(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    async fn ensure_language(
        &mut self,
        language: &str,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<(), OcrError> {
        if self.loaded.as_deref() == Some(language) {
            return Ok(());
        }

        if let Some(previous) = self.loaded.take() {
            debug!(from = %previous, to = %language, "Switching OCR language");
            self.engine.terminate().await?;
        }

        progress(OcrProgress::new("initializing engine", 0.0));
        self.engine.load(language).await?;
        progress(OcrProgress::new("initializing engine", 1.0));

        self.loaded = Some(language.to_string());
        Ok(())
    }

    /// Recognize one image in `language`.
    pub async fn recognize(
        &mut self,
        image: &Path,
        language: &str,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<Recognition, OcrError> {
        self.ensure_language(language, progress).await?;
        self.engine.recognize(image, progress).await
    }

    /// Recognize every image in order and join the trimmed texts with a
    /// blank line.
    ///
    /// `on_progress` receives the image index, the batch size and the
    /// engine's progress for that image. The first failure ends the batch.
    pub async fn recognize_batch<F>(
        &mut self,
        images: &[PathBuf],
        language: &str,
        on_progress: F,
    ) -> Result<String, OcrError>
    where
        F: Fn(usize, usize, OcrProgress) + Send + Sync,
    {
        if images.is_empty() {
            return Ok(String::new());
        }

        let total = images.len();
        let mut texts = Vec::with_capacity(total);

        for (index, image) in images.iter().enumerate() {
            let progress = |p: OcrProgress| on_progress(index, total, p);
            let recognition = self.recognize(image, language, &progress).await?;
            debug!(
                image = %image.display(),
                index = index,
                confidence = recognition.confidence,
                "Image recognized"
            );
            texts.push(recognition.text.trim().to_string());
        }

        info!(images = total, language = %language, "OCR batch complete");
        Ok(texts.join(BATCH_SEPARATOR))
    }

    /// Release the engine. The next request loads it again.
    pub async fn terminate(&mut self) -> Result<(), OcrError> {
        if self.loaded.take().is_some() {
            self.engine.terminate().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Engine returning canned text per file name and recording calls.
    #[derive(Clone, Default)]
    struct ScriptedEngine {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedEngine {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl RecognitionEngine for ScriptedEngine {
        async fn load(&mut self, language: &str) -> Result<(), OcrError> {
            self.calls.lock().push(format!("load:{}", language));
            Ok(())
        }

        async fn recognize(
            &self,
            image: &Path,
            progress: &(dyn Fn(OcrProgress) + Send + Sync),
        ) -> Result<Recognition, OcrError> {
            let name = image.to_string_lossy().to_string();
            self.calls.lock().push(format!("recognize:{}", name));
            progress(OcrProgress::new("recognizing text", 0.5));

            if name.contains("broken") {
                return Err(OcrError::Recognition {
                    image: image.to_path_buf(),
                    reason: "unreadable".to_string(),
                });
            }

            Ok(Recognition {
                text: format!("  text of {}  \n", name),
                confidence: 90.0,
            })
        }

        async fn terminate(&mut self) -> Result<(), OcrError> {
            self.calls.lock().push("terminate".to_string());
            Ok(())
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty_string() {
        let engine = ScriptedEngine::default();
        let mut batch = BatchRecognizer::new(engine.clone());

        let text = batch.recognize_batch(&[], "eng", |_, _, _| {}).await.unwrap();

        assert_eq!(text, "");
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batch_joins_trimmed_texts_in_order() {
        let engine = ScriptedEngine::default();
        let mut batch = BatchRecognizer::new(engine.clone());

        let text = batch
            .recognize_batch(&paths(&["a.png", "b.png", "c.png"]), "eng", |_, _, _| {})
            .await
            .unwrap();

        assert_eq!(text, "text of a.png\n\ntext of b.png\n\ntext of c.png");
        assert_eq!(
            engine.calls(),
            vec![
                "load:eng",
                "recognize:a.png",
                "recognize:b.png",
                "recognize:c.png"
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_reports_index_and_total() {
        let engine = ScriptedEngine::default();
        let mut batch = BatchRecognizer::new(engine);
        let seen = Mutex::new(Vec::new());

        batch
            .recognize_batch(&paths(&["a.png", "b.png"]), "eng", |index, total, p| {
                seen.lock().push((index, total, p.status));
            })
            .await
            .unwrap();

        let seen = seen.into_inner();
        assert!(seen.iter().all(|(_, total, _)| *total == 2));
        assert!(seen.contains(&(0, 2, "initializing engine".to_string())));
        assert!(seen.contains(&(1, 2, "recognizing text".to_string())));
        // Engine loaded once, so the second image never reports initialization.
        assert!(!seen.contains(&(1, 2, "initializing engine".to_string())));
    }

    #[tokio::test]
    async fn test_language_change_reloads_engine() {
        let engine = ScriptedEngine::default();
        let mut batch = BatchRecognizer::new(engine.clone());

        batch.recognize_batch(&paths(&["a.png"]), "eng", |_, _, _| {}).await.unwrap();
        batch.recognize_batch(&paths(&["b.png"]), "eng", |_, _, _| {}).await.unwrap();
        batch.recognize_batch(&paths(&["c.png"]), "deu", |_, _, _| {}).await.unwrap();

        assert_eq!(batch.language(), Some("deu"));
        assert_eq!(
            engine.calls(),
            vec![
                "load:eng",
                "recognize:a.png",
                "recognize:b.png",
                "terminate",
                "load:deu",
                "recognize:c.png"
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_aborts_batch() {
        let engine = ScriptedEngine::default();
        let mut batch = BatchRecognizer::new(engine.clone());

        let result = batch
            .recognize_batch(&paths(&["a.png", "broken.png", "c.png"]), "eng", |_, _, _| {})
            .await;

        assert!(matches!(result, Err(OcrError::Recognition { .. })));
        assert!(!engine.calls().contains(&"recognize:c.png".to_string()));
    }

    #[tokio::test]
    async fn test_terminate_releases_engine() {
        let engine = ScriptedEngine::default();
        let mut batch = BatchRecognizer::new(engine.clone());

        batch.terminate().await.unwrap();
        assert!(engine.calls().is_empty());

        batch.recognize_batch(&paths(&["a.png"]), "eng", |_, _, _| {}).await.unwrap();
        batch.terminate().await.unwrap();

        assert_eq!(batch.language(), None);
        assert_eq!(engine.calls().last().map(String::as_str), Some("terminate"));
    }
}
