//! Best-effort machine translation of recognized text
//!
//! The remote endpoint is an unauthenticated public web API. Every failure is
//! reported as [`Translation::Failed`] instead of an error so the caller can
//! still return the untranslated OCR text.

use crate::config::TranslationConfig;
use serde_json::Value;
use thiserror::Error;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Outcome of one translation request
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Translated {
        detected_language: String,
        text: String,
    },
    Failed {
        error: String,
    },
}

impl Translation {
    /// Source language reported by the service, "unknown" after a failure
    pub fn detected_language(&self) -> &str {
        match self {
            Translation::Translated {
                detected_language, ..
            } => detected_language,
            Translation::Failed { .. } => UNKNOWN_LANGUAGE,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Translation::Translated { .. } => None,
            Translation::Failed { error } => Some(error),
        }
    }
}

impl From<Result<(String, String), TranslationError>> for Translation {
    fn from(result: Result<(String, String), TranslationError>) -> Self {
        match result {
            Ok((text, detected_language)) => Translation::Translated {
                detected_language,
                text,
            },
            Err(e) => Translation::Failed {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Translation is disabled on this server")]
    Disabled,

    #[error("Translation request failed: {0}")]
    Transport(String),

    #[error("Translation service returned HTTP {0}")]
    Status(u16),

    #[error("Translation response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected translation response: {0}")]
    UnexpectedShape(&'static str),
}

impl From<ureq::Error> for TranslationError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => TranslationError::Status(code),
            other => TranslationError::Transport(other.to_string()),
        }
    }
}

/// Translates text into a target language. Never fails; see [`Translation`].
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, target_language: &str) -> Translation;
}

/// Client for the public `translate_a/single` endpoint
pub struct GoogleTranslator {
    agent: ureq::Agent,
    endpoint: String,
    client: String,
    user_agent: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslationConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            endpoint: config.endpoint.clone(),
            client: config.client.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    fn request(&self, text: &str, target_language: &str) -> Result<(String, String), TranslationError> {
        let mut response = self
            .agent
            .get(&self.endpoint)
            .query("client", &self.client)
            .query("sl", "auto")
            .query("tl", target_language)
            .query("dt", "t")
            .query("q", text)
            .header("User-Agent", &self.user_agent)
            .call()?;

        let body = response.body_mut().read_to_string()?;
        parse_response(&body)
    }
}

impl Translator for GoogleTranslator {
    fn translate(&self, text: &str, target_language: &str) -> Translation {
        tracing::debug!(
            chars = text.chars().count(),
            target_language,
            "requesting translation"
        );

        let translation = Translation::from(self.request(text, target_language));
        if let Some(error) = translation.error() {
            tracing::warn!("Translation failed, keeping original text: {}", error);
        }
        translation
    }
}

/// Stand-in used when translation is switched off in the config
pub struct DisabledTranslator;

impl Translator for DisabledTranslator {
    fn translate(&self, _text: &str, _target_language: &str) -> Translation {
        Translation::from(Err(TranslationError::Disabled))
    }
}

/// Unwrap `[[[translated, original, ...], ...], _, detected_language, ...]`
///
/// Returns the concatenated translated segments and the detected language,
/// which is "unknown" when the third element is absent or not a string.
fn parse_response(body: &str) -> Result<(String, String), TranslationError> {
    let value: Value = serde_json::from_str(body)?;

    let top = value
        .as_array()
        .ok_or(TranslationError::UnexpectedShape("response is not an array"))?;

    let segments = top
        .first()
        .and_then(Value::as_array)
        .ok_or(TranslationError::UnexpectedShape("missing translated segments"))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.as_array()?.first()?.as_str())
        .collect();
    if text.is_empty() {
        return Err(TranslationError::UnexpectedShape("no translated text"));
    }

    let detected_language = top
        .get(2)
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_LANGUAGE)
        .to_string();

    Ok((text, detected_language))
}
