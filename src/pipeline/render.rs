//! pdfium operations: metadata, page splitting, text layer, rasterisation.
//!
//! Every function here is blocking. pdfium wraps a C++ library and is not
//! async-aware, so callers move these onto `tokio::task::spawn_blocking`.
//!
//! Rendering scales the page by `dpi / 72` and caps the longest edge at
//! `max_rendered_pixels`; an A0 poster at 200 DPI would otherwise allocate
//! hundreds of megabytes of pixels.

use crate::error::Pdf2TxtError;
use crate::output::DocumentMetadata;
use crate::pipeline::workdir::PageFile;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

fn open_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, Pdf2TxtError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| Pdf2TxtError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", e),
        })
}

/// Read document metadata without touching page content.
pub fn extract_metadata_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
) -> Result<DocumentMetadata, Pdf2TxtError> {
    let document = open_document(pdfium, pdf_path)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Write one single-page PDF per page of `pdf_path` into `pages_dir`.
///
/// Files already written stay on disk when a later page fails.
pub fn split_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    pages_dir: &Path,
) -> Result<Vec<PageFile>, Pdf2TxtError> {
    let split_err = |detail: String| Pdf2TxtError::SplitFailed {
        path: pdf_path.to_path_buf(),
        detail,
    };

    let source = open_document(pdfium, pdf_path)?;
    let total = source.pages().len();
    info!("PDF loaded: {} pages", total);

    std::fs::create_dir_all(pages_dir)
        .map_err(|e| split_err(format!("cannot create {}: {}", pages_dir.display(), e)))?;

    let mut files = Vec::with_capacity(total as usize);
    for idx in 0..total {
        let page = PageFile::new(idx as usize, pages_dir);

        let mut single = pdfium
            .create_new_pdf()
            .map_err(|e| split_err(format!("page {}: {:?}", page.page_num(), e)))?;
        single
            .pages_mut()
            .copy_page_from_document(&source, idx, 0)
            .map_err(|e| split_err(format!("page {}: {:?}", page.page_num(), e)))?;
        single
            .save_to_file(&page.path)
            .map_err(|e| split_err(format!("{}: {:?}", page.path.display(), e)))?;

        debug!("Wrote {}", page.path.display());
        files.push(page);
    }

    Ok(files)
}

/// The embedded text layer of a single-page PDF.
pub fn page_text_blocking(pdfium: &Pdfium, page_path: &Path) -> Result<String, String> {
    let document = pdfium
        .load_pdf_from_file(page_path, None)
        .map_err(|e| format!("cannot open {}: {:?}", page_path.display(), e))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| format!("no page in {}: {:?}", page_path.display(), e))?;
    let text = page
        .text()
        .map_err(|e| format!("text layer unreadable: {:?}", e))?;
    Ok(text.all())
}

/// Rasterise a single-page PDF.
pub fn render_page_blocking(
    pdfium: &Pdfium,
    page_path: &Path,
    dpi: u32,
    max_pixels: u32,
) -> Result<DynamicImage, String> {
    let document = pdfium
        .load_pdf_from_file(page_path, None)
        .map_err(|e| format!("cannot open {}: {:?}", page_path.display(), e))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| format!("no page in {}: {:?}", page_path.display(), e))?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("rasterisation failed: {:?}", e))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered {} → {}x{} px",
        page_path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}
