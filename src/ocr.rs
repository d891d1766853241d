//! Image -> text -> translation pipeline
//!
//! `OcrProcessor::process` is the single entry point used by the server:
//! decode, clean up, recognize, then optionally translate. Every stage runs
//! synchronously on the calling thread.

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::engines;
use crate::error::OcrError;
use crate::preprocessing::Preprocessor;
use crate::translation::{DisabledTranslator, GoogleTranslator, Translation, Translator};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Reported when translation was not attempted
pub const AUTO_LANGUAGE: &str = "auto";

/// Final result of one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub original_text: String,
    pub detected_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    pub is_translated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_error: Option<String>,
}

impl RecognitionResult {
    fn untranslated(original_text: String) -> Self {
        Self {
            original_text,
            detected_language: AUTO_LANGUAGE.to_string(),
            translated_text: None,
            is_translated: false,
            translation_error: None,
        }
    }

    /// Merge a translator outcome. Text already in the target language is
    /// never reported as translated.
    fn with_translation(
        original_text: String,
        translation: Translation,
        target_language: &str,
    ) -> Self {
        match translation {
            Translation::Translated {
                detected_language,
                text,
            } => {
                let is_translated = detected_language != target_language;
                Self {
                    original_text,
                    translated_text: is_translated.then_some(text),
                    is_translated,
                    detected_language,
                    translation_error: None,
                }
            }
            failed @ Translation::Failed { .. } => Self {
                original_text,
                detected_language: failed.detected_language().to_string(),
                translated_text: None,
                is_translated: false,
                translation_error: failed.error().map(str::to_string),
            },
        }
    }
}

pub struct OcrProcessor {
    preprocessor: Preprocessor,
    engine: Arc<dyn OcrEngine>,
    translator: Arc<dyn Translator>,
    target_language: String,
}

impl OcrProcessor {
    /// Build the processor from configuration: preprocessor, selected engine
    /// and translator (a disabled stand-in when translation is off)
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let translator: Arc<dyn Translator> = if config.translation.enabled {
            Arc::new(GoogleTranslator::new(&config.translation))
        } else {
            tracing::info!("Translation disabled");
            Arc::new(DisabledTranslator)
        };

        Ok(Self::with_parts(
            Preprocessor::new(config.preprocess.clone())?,
            engines::create(config)?,
            translator,
            config.translation.target_language.clone(),
        ))
    }

    pub fn with_parts(
        preprocessor: Preprocessor,
        engine: Arc<dyn OcrEngine>,
        translator: Arc<dyn Translator>,
        target_language: String,
    ) -> Self {
        Self {
            preprocessor,
            engine,
            translator,
            target_language,
        }
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Run the full pipeline on an image file
    ///
    /// Fails with `NotFound` when the file is missing, `DecodeFailure` when it
    /// is not a readable image and `EngineFailure` when recognition fails.
    /// Translation problems never fail the call; they are recorded in
    /// `translation_error`.
    pub fn process(&self, path: &Path, translate: bool) -> Result<RecognitionResult, OcrError> {
        let start = Instant::now();

        if !path.exists() {
            return Err(OcrError::NotFound(path.to_path_buf()));
        }

        let text = self.extract_text(path)?;

        let result = if translate && !text.trim().is_empty() {
            let translation = self.translator.translate(&text, &self.target_language);
            RecognitionResult::with_translation(text, translation, &self.target_language)
        } else {
            RecognitionResult::untranslated(text)
        };

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            text_len = result.original_text.len(),
            detected_language = %result.detected_language,
            is_translated = result.is_translated,
            "Processed {}",
            path.display()
        );

        Ok(result)
    }

    fn extract_text(&self, path: &Path) -> Result<String, OcrError> {
        let image = image::open(path).map_err(|e| OcrError::DecodeFailure(e.to_string()))?;
        let normalized = self.preprocessor.preprocess(&image)?;
        tracing::debug!(steps = ?normalized.timings(), "preprocessing steps");
        self.engine.recognize(&normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreprocessConfig;
    use crate::preprocessing::NormalizedImage;
    use image::{GrayImage, Luma};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns canned text and remembers the image sizes it was given
    struct StubEngine {
        text: Result<String, String>,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl StubEngine {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                text: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl OcrEngine for StubEngine {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn description(&self) -> &'static str {
            "canned text"
        }

        fn recognize(&self, image: &NormalizedImage) -> Result<String, OcrError> {
            self.seen
                .lock()
                .unwrap()
                .push((image.width(), image.height()));
            self.text.clone().map_err(OcrError::EngineFailure)
        }

        fn languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }
    }

    struct StubTranslator {
        outcome: Translation,
        calls: AtomicUsize,
        targets: Mutex<Vec<String>>,
    }

    impl StubTranslator {
        fn new(outcome: Translation) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                targets: Mutex::new(Vec::new()),
            })
        }

        fn detecting(lang: &str, text: &str) -> Arc<Self> {
            Self::new(Translation::Translated {
                detected_language: lang.to_string(),
                text: text.to_string(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Translator for StubTranslator {
        fn translate(&self, _text: &str, target_language: &str) -> Translation {
            self.targets.lock().unwrap().push(target_language.to_string());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn processor(engine: Arc<StubEngine>, translator: Arc<StubTranslator>) -> OcrProcessor {
        processor_targeting(engine, translator, "en")
    }

    fn processor_targeting(
        engine: Arc<StubEngine>,
        translator: Arc<StubTranslator>,
        target_language: &str,
    ) -> OcrProcessor {
        OcrProcessor::with_parts(
            Preprocessor::new(PreprocessConfig::default()).unwrap(),
            engine,
            translator,
            target_language.to_string(),
        )
    }

    fn png_file(width: u32, height: u32) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        GrayImage::from_fn(width, height, |x, _| {
            if x % 8 < 3 {
                Luma([20])
            } else {
                Luma([240])
            }
        })
        .save(file.path())
        .unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let translator = StubTranslator::detecting("hi", "Hello");
        let p = processor(StubEngine::returning("HELLO"), translator.clone());

        let err = p
            .process(Path::new("/definitely/not/here.png"), true)
            .unwrap_err();

        assert!(matches!(err, OcrError::NotFound(_)));
        assert_eq!(translator.calls(), 0);
    }

    #[test]
    fn test_corrupt_file_is_decode_failure() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"this is not a jpeg").unwrap();
        let engine = StubEngine::returning("HELLO");
        let p = processor(engine.clone(), StubTranslator::detecting("en", "HELLO"));

        let err = p.process(file.path(), false).unwrap_err();

        assert!(matches!(err, OcrError::DecodeFailure(_)));
        assert!(err.is_processing_error());
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_engine_failure_is_distinct_from_decode_failure() {
        let file = png_file(24, 16);
        let p = processor(
            StubEngine::failing("no traineddata for hin"),
            StubTranslator::detecting("en", ""),
        );

        let err = p.process(file.path(), false).unwrap_err();

        assert!(matches!(err, OcrError::EngineFailure(ref m) if m.contains("hin")));
        assert!(err.is_processing_error());
    }

    #[test]
    fn test_engine_receives_image_with_original_dimensions() {
        let file = png_file(24, 16);
        let engine = StubEngine::returning("HELLO\n");
        let p = processor(engine.clone(), StubTranslator::detecting("en", "HELLO"));

        p.process(file.path(), false).unwrap();

        assert_eq!(*engine.seen.lock().unwrap(), vec![(24, 16)]);
    }

    #[test]
    fn test_without_flag_translator_is_not_called() {
        let file = png_file(24, 16);
        let translator = StubTranslator::detecting("hi", "Hello");
        let p = processor(StubEngine::returning("HELLO\n\x0c"), translator.clone());

        let result = p.process(file.path(), false).unwrap();

        assert_eq!(result.original_text, "HELLO\n\x0c");
        assert_eq!(result.detected_language, AUTO_LANGUAGE);
        assert!(!result.is_translated);
        assert_eq!(result.translated_text, None);
        assert_eq!(result.translation_error, None);
        assert_eq!(translator.calls(), 0);
    }

    #[test]
    fn test_english_text_is_not_translated() {
        let file = png_file(24, 16);
        let p = processor(
            StubEngine::returning("HELLO"),
            StubTranslator::detecting("en", "HELLO"),
        );

        let result = p.process(file.path(), true).unwrap();

        assert_eq!(result.detected_language, "en");
        assert!(!result.is_translated);
        assert_eq!(result.translated_text, None);
    }

    #[test]
    fn test_foreign_text_is_translated() {
        let file = png_file(24, 16);
        let p = processor(
            StubEngine::returning("नमस्ते दुनिया"),
            StubTranslator::detecting("hi", "Hello world"),
        );

        let result = p.process(file.path(), true).unwrap();

        assert_eq!(result.original_text, "नमस्ते दुनिया");
        assert_eq!(result.detected_language, "hi");
        assert!(result.is_translated);
        assert_eq!(result.translated_text.as_deref(), Some("Hello world"));
        assert_eq!(result.translation_error, None);
    }

    #[test]
    fn test_text_already_in_configured_target_is_not_translated() {
        let file = png_file(24, 16);
        let translator = StubTranslator::detecting("hi", "नमस्ते");
        let p = processor_targeting(StubEngine::returning("नमस्ते"), translator.clone(), "hi");

        let result = p.process(file.path(), true).unwrap();

        assert_eq!(translator.targets.lock().unwrap().as_slice(), ["hi"]);
        assert_eq!(result.detected_language, "hi");
        assert!(!result.is_translated);
        assert_eq!(result.translated_text, None);
    }

    #[test]
    fn test_translation_failure_degrades_to_original_text() {
        let file = png_file(24, 16);
        let p = processor(
            StubEngine::returning("नमस्ते"),
            StubTranslator::new(Translation::Failed {
                error: "Translation request failed: timed out".to_string(),
            }),
        );

        let result = p.process(file.path(), true).unwrap();

        assert_eq!(result.original_text, "नमस्ते");
        assert_eq!(result.detected_language, "unknown");
        assert!(!result.is_translated);
        assert_eq!(result.translated_text, None);
        assert_eq!(
            result.translation_error.as_deref(),
            Some("Translation request failed: timed out")
        );
    }

    #[test]
    fn test_blank_text_skips_translation() {
        let file = png_file(24, 16);
        let translator = StubTranslator::detecting("hi", "Hello");
        let p = processor(StubEngine::returning(" \n\x0c"), translator.clone());

        let result = p.process(file.path(), true).unwrap();

        assert!(!result.is_translated);
        assert_eq!(result.detected_language, AUTO_LANGUAGE);
        assert_eq!(translator.calls(), 0);
    }

    #[test]
    fn test_repeated_runs_give_same_text() {
        let file = png_file(24, 16);
        let p = processor(
            StubEngine::returning("HELLO"),
            StubTranslator::detecting("en", "HELLO"),
        );

        let first = p.process(file.path(), false).unwrap();
        let second = p.process(file.path(), false).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_result_json_omits_absent_fields() {
        let result = RecognitionResult::untranslated("HELLO".to_string());

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "original_text": "HELLO",
                "detected_language": "auto",
                "is_translated": false
            })
        );
    }
}
