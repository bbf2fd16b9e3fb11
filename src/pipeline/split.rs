//! Page splitter: one single-page PDF per source page.

use crate::error::Pdf2TxtError;
use crate::pipeline::render;
use crate::pipeline::workdir::{PageFile, WorkDir};
use pdfium_render::prelude::Pdfium;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Split `pdf_path` into `work.pages_dir()`.
///
/// With `resume` set and a complete split of `page_count` pages already on
/// disk, the existing files are returned and nothing is written.
pub async fn split_pages(
    pdfium: &Arc<Pdfium>,
    pdf_path: &Path,
    work: &WorkDir,
    page_count: usize,
    resume: bool,
) -> Result<Vec<PageFile>, Pdf2TxtError> {
    if resume {
        if let Some(existing) = work.existing_pages(page_count) {
            info!(
                "Reusing {} single-page PDFs from {}",
                existing.len(),
                work.pages_dir().display()
            );
            return Ok(existing);
        }
    }

    let pdfium = Arc::clone(pdfium);
    let path = pdf_path.to_path_buf();
    let pages_dir = work.pages_dir();

    let pages = tokio::task::spawn_blocking(move || {
        render::split_blocking(&pdfium, &path, &pages_dir)
    })
    .await
    .map_err(|e| Pdf2TxtError::Internal(format!("Split task panicked: {}", e)))??;

    if pages.len() != page_count {
        return Err(Pdf2TxtError::SplitFailed {
            path: pdf_path.to_path_buf(),
            detail: format!(
                "wrote {} page files for a {}-page document",
                pages.len(),
                page_count
            ),
        });
    }

    info!("Split into {} single-page PDFs", pages.len());
    Ok(pages)
}
