//! Statically linked Tesseract engine
//!
//! Uses the tesseract-static crate, so no system installation is needed.
//! Downloads tessdata (training data) for every configured language on
//! first start.

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::preprocessing::NormalizedImage;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tesseract_static::tesseract::Tesseract;

pub struct LeptessEngine {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Languages joined with '+'
    languages: String,
}

impl LeptessEngine {
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let language_list = config.ocr.language_list();
        let languages = language_list.join("+");

        let tessdata_path = match &config.ocr.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language_list)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(&languages)).map_err(|e| {
            OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!(
            "Static tesseract engine initialized (tessdata: {}, languages: {})",
            tessdata_path,
            languages
        );

        Ok(Self {
            tessdata_path,
            languages,
        })
    }
}

impl OcrEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "tesseract-static"
    }

    fn description(&self) -> &'static str {
        "Statically linked Tesseract running all configured language models together"
    }

    fn recognize(&self, image: &NormalizedImage) -> Result<String, OcrError> {
        let (width, height) = (image.width(), image.height());

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        image
            .as_gray()
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::EngineFailure(format!("Failed to convert to BMP: {}", e)))?;

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.languages))
            .map_err(|e| OcrError::EngineFailure(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::EngineFailure(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| OcrError::EngineFailure(format!("Failed to recognize text: {}", e)))?;

        tess.get_text()
            .map_err(|e| OcrError::EngineFailure(format!("Failed to get text: {}", e)))
    }

    fn languages(&self) -> Vec<String> {
        self.languages.split('+').map(str::to_string).collect()
    }
}

/// Ensure tessdata is available for every language, downloading if needed
fn ensure_tessdata_available(languages: &[String]) -> Result<String, OcrError> {
    let cache_dir = tessdata_cache_dir();

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create tessdata directory: {}", e))
    })?;

    for language in languages {
        let traineddata_path = cache_dir.join(format!("{}.traineddata", language));
        if traineddata_path.exists() {
            tracing::debug!("Using cached tessdata for '{}'", language);
            continue;
        }

        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&tessdata_url(language), &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    }

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
}

fn tessdata_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ocr-translate-server")
        .join("tessdata")
}

/// tessdata_fast keeps the eight-model download small
fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

/// Download a file from URL to path using ureq
///
/// Writes to a sibling temp file first so an interrupted download never
/// leaves a truncated `.traineddata` behind.
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::InitializationError(format!("Failed to download tessdata: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::InitializationError(format!("Failed to read tessdata response: {}", e))
    })?;

    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create tessdata file: {}", e))
    })?;

    file.write_all(&buffer).map_err(|e| {
        OcrError::InitializationError(format!("Failed to write tessdata file: {}", e))
    })?;

    std::fs::rename(&partial, path).map_err(|e| {
        OcrError::InitializationError(format!("Failed to move tessdata into place: {}", e))
    })
}
