//! Progress-callback trait for per-page pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as pages move through extraction and cleanup. The CLI renders them
//! as an `indicatif` progress bar; a library caller can forward them to a
//! channel or a log.
//!
//! Pages run concurrently, so `on_page_start`, `on_page_complete` and
//! `on_page_error` may be called from several tasks at once.

use crate::output::ExtractionMethod;
use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once after splitting, before any page is processed.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page is admitted by the dispatcher.
    ///
    /// `page_num` is 1-indexed.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been extracted and cleaned.
    ///
    /// # Arguments
    /// * `method`: how the raw text was obtained
    /// * `text_len`: byte length of the cleaned text
    fn on_page_complete(
        &self,
        page_num: usize,
        total_pages: usize,
        method: ExtractionMethod,
        text_len: usize,
    ) {
        let _ = (page_num, total_pages, method, text_len);
    }

    /// Called when a page fails extraction or cleanup.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after all pages have been attempted.
    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
