//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! Tesseract backends. The static backend is compiled only with the
//! `engine-tesseract-static` feature.

pub mod tesseract;

#[cfg(feature = "engine-tesseract-static")]
pub mod leptess;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Names of the engines compiled into this binary
pub fn available() -> Vec<EngineInfo> {
    #[allow(unused_mut)]
    let mut engines = vec![EngineInfo {
        name: "tesseract",
        description: "Installed Tesseract executable",
    }];

    #[cfg(feature = "engine-tesseract-static")]
    engines.push(EngineInfo {
        name: "tesseract-static",
        description: "Statically linked Tesseract",
    });

    engines
}

/// Build the engine selected in the configuration
pub fn create(config: &Config) -> Result<Arc<dyn OcrEngine>, OcrError> {
    match config.ocr.engine.as_str() {
        "tesseract" => {
            tracing::info!("Initializing tesseract engine...");
            Ok(Arc::new(tesseract::TesseractEngine::new(config)?))
        }
        #[cfg(feature = "engine-tesseract-static")]
        "tesseract-static" => {
            tracing::info!("Initializing static tesseract engine...");
            Ok(Arc::new(leptess::LeptessEngine::new(config)?))
        }
        other => {
            let names: Vec<&str> = available().iter().map(|e| e.name).collect();
            Err(OcrError::InitializationError(format!(
                "Unknown OCR engine '{}'. Available: {}",
                other,
                names.join(", ")
            )))
        }
    }
}
