use crate::error::OcrError;
use crate::preprocessing::NormalizedImage;

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in a cleaned image
    ///
    /// The text is returned exactly as the engine produced it, including
    /// trailing whitespace and newlines.
    fn recognize(&self, image: &NormalizedImage) -> Result<String, OcrError>;

    /// Language models the engine runs together on every image
    fn languages(&self) -> Vec<String>;
}
