//! Page source: the embedded text layer and rendered image of one page.
//!
//! The extractor talks to this trait rather than to pdfium directly, so the
//! OCR fallback policy can be exercised without a PDF engine.

use crate::pipeline::render;
use crate::pipeline::workdir::PageFile;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::Pdfium;
use std::sync::Arc;

/// Read access to a single page.
///
/// Errors are human-readable details; the caller attaches the page number.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Text encoded in the page's content stream (possibly empty).
    async fn embedded_text(&self, page: &PageFile) -> Result<String, String>;

    /// The page rendered to an image for OCR.
    async fn render(&self, page: &PageFile) -> Result<DynamicImage, String>;
}

/// [`PageSource`] backed by pdfium, reading the single-page PDF files.
pub struct PdfiumSource {
    pdfium: Arc<Pdfium>,
    dpi: u32,
    max_pixels: u32,
}

impl PdfiumSource {
    pub fn new(pdfium: Arc<Pdfium>, dpi: u32, max_pixels: u32) -> Self {
        Self {
            pdfium,
            dpi,
            max_pixels,
        }
    }
}

#[async_trait]
impl PageSource for PdfiumSource {
    async fn embedded_text(&self, page: &PageFile) -> Result<String, String> {
        let pdfium = Arc::clone(&self.pdfium);
        let path = page.path.clone();
        tokio::task::spawn_blocking(move || render::page_text_blocking(&pdfium, &path))
            .await
            .map_err(|e| format!("text task panicked: {}", e))?
    }

    async fn render(&self, page: &PageFile) -> Result<DynamicImage, String> {
        let pdfium = Arc::clone(&self.pdfium);
        let path = page.path.clone();
        let (dpi, max_pixels) = (self.dpi, self.max_pixels);
        tokio::task::spawn_blocking(move || {
            render::render_page_blocking(&pdfium, &path, dpi, max_pixels)
        })
        .await
        .map_err(|e| format!("render task panicked: {}", e))?
    }
}
