use crate::error::OcrError;
use crate::Args;
use std::time::Duration;

pub const DEFAULT_ENGINE: &str = "tesseract";

/// English plus seven Indic scripts, recognized in a single pass
pub const DEFAULT_LANGUAGES: &str = "eng+hin+ben+tam+tel+kan+mal+guj";

pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// The endpoint rejects requests carrying a default HTTP client user agent
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub ocr: OcrConfig,
    pub preprocess: PreprocessConfig,
    pub translation: TranslationConfig,
}

/// Recognizer settings
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub engine: String,
    pub languages: String,
    pub tesseract_cmd: String,
    pub tessdata_path: Option<String>,
}

impl OcrConfig {
    /// Individual language codes ("eng", "hin", ...)
    pub fn language_list(&self) -> Vec<String> {
        self.languages
            .split('+')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            languages: DEFAULT_LANGUAGES.to_string(),
            tesseract_cmd: "tesseract".to_string(),
            tessdata_path: None,
        }
    }
}

/// Image cleanup parameters. Defaults match the fixed pipeline:
/// Largest accepted non-local-means template window
pub const MAX_TEMPLATE_WINDOW: u32 = 15;

/// Largest accepted non-local-means search window
pub const MAX_SEARCH_WINDOW: u32 = 35;

/// Otsu binarization (fallback threshold 150), then non-local-means with
/// h = 10, a 7x7 template window and a 21x21 search window.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub binary_threshold: u8,
    pub use_otsu: bool,
    pub denoise_strength: f32,
    pub template_window: u32,
    pub search_window: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            binary_threshold: 150,
            use_otsu: true,
            denoise_strength: 10.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.template_window == 0 || self.template_window % 2 == 0 {
            return Err(OcrError::InitializationError(format!(
                "template window must be odd and positive, got {}",
                self.template_window
            )));
        }
        if self.search_window == 0 || self.search_window % 2 == 0 {
            return Err(OcrError::InitializationError(format!(
                "search window must be odd and positive, got {}",
                self.search_window
            )));
        }
        if self.template_window > MAX_TEMPLATE_WINDOW || self.search_window > MAX_SEARCH_WINDOW {
            return Err(OcrError::InitializationError(format!(
                "windows are limited to {}x{} (template) and {}x{} (search), got {} and {}",
                MAX_TEMPLATE_WINDOW,
                MAX_TEMPLATE_WINDOW,
                MAX_SEARCH_WINDOW,
                MAX_SEARCH_WINDOW,
                self.template_window,
                self.search_window
            )));
        }
        if self.search_window < self.template_window {
            return Err(OcrError::InitializationError(format!(
                "search window ({}) must not be smaller than template window ({})",
                self.search_window, self.template_window
            )));
        }
        if self.denoise_strength.is_nan() || self.denoise_strength <= 0.0 {
            return Err(OcrError::InitializationError(format!(
                "denoise strength must be positive, got {}",
                self.denoise_strength
            )));
        }
        Ok(())
    }
}

/// Remote translation settings
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub client: String,
    pub user_agent: String,
    pub target_language: String,
    pub timeout: Duration,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_TRANSLATE_ENDPOINT.to_string(),
            client: "gtx".to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            target_language: "en".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), OcrError> {
        self.preprocess.validate()?;
        if self.ocr.language_list().is_empty() {
            return Err(OcrError::InitializationError(
                "at least one OCR language is required".to_string(),
            ));
        }
        if self.translation.timeout.is_zero() {
            return Err(OcrError::InitializationError(
                "translation timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            ocr: OcrConfig {
                engine: args.engine,
                languages: args.languages,
                tesseract_cmd: args.tesseract_cmd,
                tessdata_path: args.tessdata_path,
            },
            preprocess: PreprocessConfig {
                binary_threshold: args.binary_threshold,
                use_otsu: !args.no_otsu,
                denoise_strength: args.denoise_strength,
                template_window: args.template_window,
                search_window: args.search_window,
            },
            translation: TranslationConfig {
                enabled: !args.disable_translation,
                endpoint: args.translate_endpoint,
                client: args.translate_client,
                user_agent: BROWSER_USER_AGENT.to_string(),
                target_language: args.target_language,
                timeout: Duration::from_secs(args.translate_timeout_secs),
            },
        }
    }
}
