use crate::config::PreprocessConfig;
use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: &'static str,
    pub time_ms: u64,
}

/// Grayscale, binarized, denoised image ready for recognition
///
/// Only [`Preprocessor::preprocess`] builds one, so holding a
/// `NormalizedImage` means the full cleanup has run.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    image: GrayImage,
    timings: Vec<StepTiming>,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn timings(&self) -> &[StepTiming] {
        &self.timings
    }

    #[cfg(test)]
    pub fn from_gray(image: GrayImage) -> Self {
        Self {
            image,
            timings: Vec::new(),
        }
    }
}

/// Fixed cleanup pipeline: grayscale -> threshold -> denoise
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Result<Self, OcrError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run every step on a decoded image
    pub fn preprocess(&self, image: &DynamicImage) -> Result<NormalizedImage, OcrError> {
        let start = Instant::now();
        let mut timings = Vec::with_capacity(3);
        let cfg = &self.config;

        let gray = run_step("grayscale", &mut timings, || steps::grayscale::apply(image));
        let binary = run_step("threshold", &mut timings, || {
            steps::threshold::apply(&gray, cfg.binary_threshold, cfg.use_otsu)
        });
        let cleaned = run_step("denoise", &mut timings, || {
            steps::denoise::apply(
                &binary,
                cfg.denoise_strength,
                cfg.template_window,
                cfg.search_window,
            )
        });

        if cleaned.dimensions() != (image.width(), image.height()) {
            return Err(OcrError::PreprocessingError(format!(
                "cleanup changed image size from {}x{} to {}x{}",
                image.width(),
                image.height(),
                cleaned.width(),
                cleaned.height()
            )));
        }

        tracing::debug!(
            total_ms = start.elapsed().as_millis() as u64,
            "preprocessed {}x{} image",
            cleaned.width(),
            cleaned.height()
        );

        Ok(NormalizedImage {
            image: cleaned,
            timings,
        })
    }
}

fn run_step<T, F>(name: &'static str, timings: &mut Vec<StepTiming>, step_fn: F) -> T
where
    F: FnOnce() -> T,
{
    let step_start = Instant::now();
    let result = step_fn();
    timings.push(StepTiming {
        name,
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    result
}
