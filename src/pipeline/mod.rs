//! Pipeline stages for PDF-to-text cleanup.
//!
//! Each submodule implements exactly one step; the page pipeline that ties
//! extraction and cleanup together lives here.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ extract ──▶ clean ──▶ merge
//! (path)   (pdfium)  (text/OCR)  (LLM)    (ordered join)
//! ```
//!
//! 1. [`input`]: resolve a file or directory argument to one PDF
//! 2. [`split`]: one single-page PDF per page in the working directory
//! 3. [`extract`]: embedded text, local OCR, or LLM OCR per [`OcrMode`]
//! 4. [`clean`]: LLM correction followed by [`postprocess`] rules
//! 5. [`dispatch`]: runs 3–4 for every page with bounded concurrency
//! 6. [`merge`]: page-ordered join and atomic output write
//!
//! pdfium, tesseract and the LLM sit behind [`PageSource`], [`LocalOcr`] and
//! [`ChatBackend`]; [`Engines`] bundles one of each for a run.
//!
//! [`OcrMode`]: crate::config::OcrMode

pub mod clean;
pub mod dispatch;
pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod merge;
pub mod ocr;
pub mod pdfium;
pub mod postprocess;
pub mod render;
pub mod source;
pub mod split;
pub mod workdir;

pub use llm::ChatBackend;
pub use ocr::LocalOcr;
pub use source::PageSource;

use crate::config::{FailedPagePolicy, PipelineConfig};
use crate::error::{PageError, Pdf2TxtError};
use crate::output::{ExtractionMethod, PageResult};
use dispatch::{run_ordered, Dispatch};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use workdir::{Artifact, PageFile, WorkDir};

/// The collaborators a run talks to.
#[derive(Clone)]
pub struct Engines {
    pub source: Arc<dyn PageSource>,
    /// `None` when no local OCR engine is installed.
    pub local_ocr: Option<Arc<dyn LocalOcr>>,
    pub ocr_llm: Arc<dyn ChatBackend>,
    pub cleanup_llm: Arc<dyn ChatBackend>,
}

/// Extract and clean every page with at most `config.concurrency` in flight.
///
/// Results come back in page order. Under [`FailedPagePolicy::Abort`] the
/// first failed page cancels the rest and the run fails with
/// [`Pdf2TxtError::PageAborted`].
pub async fn process_pages(
    pages: &[PageFile],
    config: &PipelineConfig,
    engines: &Engines,
    work: &WorkDir,
) -> Result<Vec<PageResult>, Pdf2TxtError> {
    let total = pages.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }
    info!(
        "Processing {} pages ({} mode, concurrency {})",
        total, config.ocr_mode, config.concurrency
    );

    let abort = config.on_page_failure == FailedPagePolicy::Abort;
    let outcome = run_ordered(
        total,
        config.concurrency,
        |pos| process_page(pages, pos, config, engines, work),
        |result: &PageResult| abort && !result.is_ok(),
    )
    .await;

    let results = match outcome {
        Dispatch::Completed(results) => results,
        Dispatch::Stopped(failed) => {
            warn!("Page {} failed, aborting run", failed.page_num);
            return Err(match failed.error {
                Some(source) => Pdf2TxtError::PageAborted { source },
                None => Pdf2TxtError::Internal("aborted on a successful page".into()),
            });
        }
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, results.iter().filter(|r| r.is_ok()).count());
    }
    Ok(results)
}

/// Run one page through extract → clean, reusing artifacts on resume.
async fn process_page(
    pages: &[PageFile],
    pos: usize,
    config: &PipelineConfig,
    engines: &Engines,
    work: &WorkDir,
) -> PageResult {
    let page = &pages[pos];
    let page_num = page.page_num();
    let total = pages.len();
    let start = Instant::now();

    if let Some(ref cb) = config.progress_callback {
        cb.on_page_start(page_num, total);
    }

    let mut result = match run_page(pages, pos, config, engines, work).await {
        Ok(result) => result,
        Err((method, err)) => PageResult::failed(page_num, method, err),
    };
    result.duration_ms = start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        match &result.error {
            None => cb.on_page_complete(page_num, total, result.method, result.text.len()),
            Some(e) => cb.on_page_error(page_num, total, &e.to_string()),
        }
    }
    if let Some(ref e) = result.error {
        warn!("{}", e);
    }
    result
}

async fn run_page(
    pages: &[PageFile],
    pos: usize,
    config: &PipelineConfig,
    engines: &Engines,
    work: &WorkDir,
) -> Result<PageResult, (ExtractionMethod, PageError)> {
    let page = &pages[pos];
    let page_num = page.page_num();
    let none = |e| (ExtractionMethod::None, e);

    if config.resume {
        if let Some(text) = work.read_artifact(page, Artifact::Clean).await.map_err(none)? {
            debug!("Page {}: reusing cleaned text", page_num);
            let raw_len = work
                .read_artifact(page, Artifact::Raw)
                .await
                .map_err(none)?
                .map_or(0, |raw| raw.len());
            return Ok(PageResult {
                page_num,
                method: ExtractionMethod::Resumed,
                raw_len,
                text,
                input_tokens: 0,
                output_tokens: 0,
                retries: 0,
                duration_ms: 0,
                error: None,
            });
        }
    }

    let resumed_raw = if config.resume {
        work.read_artifact(page, Artifact::Raw).await.map_err(none)?
    } else {
        None
    };

    let extraction = match resumed_raw {
        Some(text) => {
            debug!("Page {}: reusing raw text", page_num);
            extract::Extraction {
                text,
                method: ExtractionMethod::Resumed,
                input_tokens: 0,
                output_tokens: 0,
                retries: 0,
            }
        }
        None => {
            let extraction = extract::extract_page(pages, pos, config, engines)
                .await
                .map_err(none)?;
            work.write_artifact(page, Artifact::Raw, &extraction.text)
                .await
                .map_err(|e| (extraction.method, e))?;
            extraction
        }
    };
    let method = extraction.method;

    let cleaned = clean::clean_page(page_num, &extraction.text, config, engines.cleanup_llm.as_ref())
        .await
        .map_err(|e| (method, e))?;
    work.write_artifact(page, Artifact::Clean, &cleaned.text)
        .await
        .map_err(|e| (method, e))?;

    Ok(PageResult {
        page_num,
        method,
        raw_len: extraction.text.len(),
        text: cleaned.text,
        input_tokens: extraction.input_tokens + cleaned.input_tokens,
        output_tokens: extraction.output_tokens + cleaned.output_tokens,
        retries: extraction.retries + cleaned.retries,
        duration_ms: 0,
        error: None,
    })
}
