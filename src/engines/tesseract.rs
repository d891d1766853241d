//! Tesseract executable engine
//!
//! Writes the cleaned image to a temporary PNG and runs the installed
//! `tesseract` binary on it with every configured language model at once.
//! Needs tesseract and the matching `*.traineddata` files on the host.

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::preprocessing::NormalizedImage;
use std::process::Command;

pub struct TesseractEngine {
    /// Executable to run
    command: String,
    /// Languages joined with '+', as tesseract's `-l` expects
    languages: String,
    tessdata_path: Option<String>,
}

impl TesseractEngine {
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let engine = Self {
            command: config.ocr.tesseract_cmd.clone(),
            languages: config.ocr.language_list().join("+"),
            tessdata_path: config.ocr.tessdata_path.clone(),
        };

        // A missing binary only fails the requests that need it
        match engine.version() {
            Ok(version) => tracing::info!(
                "Tesseract engine initialized ({}, languages: {})",
                version,
                engine.languages
            ),
            Err(e) => tracing::warn!("Tesseract is not usable yet: {}", e),
        }

        Ok(engine)
    }

    fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| OcrError::EngineFailure(format!("Failed to execute {}: {}", self.command, e)))?;

        // Older releases print the version banner on stderr
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn build_command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(input).arg("stdout").arg("-l").arg(&self.languages);
        if let Some(dir) = &self.tessdata_path {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Installed Tesseract executable running all configured language models together"
    }

    fn recognize(&self, image: &NormalizedImage) -> Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Internal(format!("Failed to create temp file: {}", e)))?;

        image
            .as_gray()
            .save_with_format(input.path(), image::ImageFormat::Png)
            .map_err(|e| OcrError::EngineFailure(format!("Failed to write image for tesseract: {}", e)))?;

        tracing::debug!(
            "Running {} on {}x{} image with languages {}",
            self.command,
            image.width(),
            image.height(),
            self.languages
        );

        let output = self
            .build_command(input.path())
            .output()
            .map_err(|e| OcrError::EngineFailure(format!("Failed to execute {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::EngineFailure(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| OcrError::EngineFailure(format!("Invalid UTF-8 output: {}", e)))
    }

    fn languages(&self) -> Vec<String> {
        self.languages.split('+').map(str::to_string).collect()
    }
}
