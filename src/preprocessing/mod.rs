//! Image cleanup ahead of OCR
//!
//! Grayscale, Otsu binarization and non-local-means denoising, always in that
//! order. The parameters come from [`crate::config::PreprocessConfig`].

pub mod pipeline;
pub mod steps;

pub use pipeline::{NormalizedImage, Preprocessor};
