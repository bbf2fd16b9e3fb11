//! Local OCR via the `tesseract` command-line tool.
//!
//! The rendered page is written to a temporary PNG and `tesseract <png>
//! stdout -l <lang> --psm 1` is run as a child process, so OCR never blocks a
//! Tokio worker thread. Availability is probed once at startup with
//! `tesseract --version`; when it is missing the extractor applies the
//! mode's fallback rule instead of failing every page.

use crate::language::tesseract_language;
use async_trait::async_trait;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Turns a rendered page into text.
#[async_trait]
pub trait LocalOcr: Send + Sync {
    async fn recognise(&self, image: &DynamicImage) -> Result<String, String>;
}

/// [`LocalOcr`] backed by the tesseract executable.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    /// `language` is an ISO 639-1 code or a tesseract pack name.
    pub fn new(binary: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            binary: binary.into(),
            language: tesseract_language(language),
        }
    }

    /// The tesseract language pack in use.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// True when `binary --version` runs successfully.
    pub async fn probe(binary: &Path) -> bool {
        match Command::new(binary).arg("--version").output().await {
            Ok(out) if out.status.success() => true,
            Ok(out) => {
                warn!(
                    "{} --version exited with {}",
                    binary.display(),
                    out.status
                );
                false
            }
            Err(e) => {
                debug!("tesseract not available at {}: {}", binary.display(), e);
                false
            }
        }
    }
}

#[async_trait]
impl LocalOcr for TesseractOcr {
    async fn recognise(&self, image: &DynamicImage) -> Result<String, String> {
        let file = tempfile::Builder::new()
            .prefix("pdf2txt-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| format!("cannot create temp image: {}", e))?;

        let img = image.clone();
        let img_path = file.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            img.save_with_format(&img_path, image::ImageFormat::Png)
        })
        .await
        .map_err(|e| format!("image write task panicked: {}", e))?
        .map_err(|e| format!("cannot write temp image: {}", e))?;

        let output = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("1")
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {}", self.binary.display(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("tesseract exited with {}: {}", output.status, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
