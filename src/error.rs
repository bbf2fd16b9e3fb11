//! Error types for the edgequake-pdf2txt library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2TxtError`]: **Fatal**: the run cannot proceed at all (bad input
//!   path, pdfium missing, output not writable). Returned as
//!   `Err(Pdf2TxtError)` from the top-level `convert*` functions.
//!
//! * [`PageError`]: **Non-fatal**: a single page failed extraction or
//!   cleanup while its siblings are fine. Stored inside
//!   [`crate::output::PageResult`]; what happens to the page in the merged
//!   file is decided by [`crate::config::FailedPagePolicy`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2txt library.
#[derive(Debug, Error)]
pub enum Pdf2TxtError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file or directory was not found.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input was a directory without any `*.pdf` file in it.
    #[error("No PDF file found in directory '{dir}'")]
    NoPdfInDirectory { dir: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open the document.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Writing the single-page PDFs failed.
    #[error("Failed to split '{path}' into pages: {detail}")]
    SplitFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib) to point at an\n\
existing copy, or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Run errors ────────────────────────────────────────────────────────
    /// A page failed while [`crate::config::FailedPagePolicy::Abort`] was set.
    /// In-flight sibling pages were cancelled.
    #[error("Run aborted: {source}")]
    PageAborted {
        #[source]
        source: PageError,
    },

    /// Every page failed; there is nothing to merge.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    /// The page collection handed to the merger has a hole or a stray index.
    #[error("Cannot merge pages: {detail}")]
    MergeFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create a working directory.
    #[error("Failed to prepare working directory '{path}': {source}")]
    WorkDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Embedded-text extraction, rendering, or OCR failed.
    #[error("Page {page}: extraction failed: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// The page needed local OCR but no engine is available.
    #[error("Page {page}: no embedded text and local OCR is unavailable")]
    OcrUnavailable { page: usize },

    /// The cleanup LLM call failed after retries.
    #[error("Page {page}: cleanup failed after {retries} retries: {detail}")]
    CleanupFailed {
        page: usize,
        retries: u32,
        detail: String,
    },

    /// Reading or writing a per-page artifact in the working directory failed.
    #[error("Page {page}: artifact I/O failed: {detail}")]
    ArtifactIo { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::ExtractionFailed { page, .. }
            | PageError::OcrUnavailable { page }
            | PageError::CleanupFailed { page, .. }
            | PageError::ArtifactIo { page, .. } => *page,
        }
    }

    /// The message without its leading `Page N: `.
    pub fn reason(&self) -> String {
        let msg = self.to_string();
        let prefix = format!("Page {}: ", self.page());
        match msg.strip_prefix(&prefix) {
            Some(rest) => rest.to_string(),
            None => msg,
        }
    }
}
