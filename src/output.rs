//! Result types returned by a conversion run.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a page's raw text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// The page's embedded text layer.
    Embedded,
    /// Local OCR (tesseract) on the rendered page.
    LocalOcr,
    /// LLM OCR on the rendered page with neighbour context.
    LlmOcr,
    /// Read back from an earlier run's artifacts.
    Resumed,
    /// Extraction never produced text (the page failed first).
    None,
}

impl ExtractionMethod {
    /// True for either OCR path.
    pub fn is_ocr(self) -> bool {
        matches!(self, ExtractionMethod::LocalOcr | ExtractionMethod::LlmOcr)
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionMethod::Embedded => "embedded",
            ExtractionMethod::LocalOcr => "local-ocr",
            ExtractionMethod::LlmOcr => "llm-ocr",
            ExtractionMethod::Resumed => "resumed",
            ExtractionMethod::None => "none",
        };
        f.write_str(s)
    }
}

/// Outcome of running one page through extract → clean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    pub method: ExtractionMethod,
    /// Byte length of the raw (pre-cleanup) text.
    pub raw_len: usize,
    /// Cleaned text; empty when `error` is set.
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// LLM retries spent on this page (OCR and cleanup combined).
    pub retries: u32,
    pub duration_ms: u64,
    pub error: Option<PageError>,
}

impl PageResult {
    /// A failed page result carrying `error`.
    pub fn failed(page_num: usize, method: ExtractionMethod, error: PageError) -> Self {
        Self {
            page_num,
            method,
            raw_len: 0,
            text: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            retries: 0,
            duration_ms: 0,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Basic document facts read without processing any page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub embedded_pages: usize,
    pub ocr_pages: usize,
    pub resumed_pages: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub split_duration_ms: u64,
    pub pipeline_duration_ms: u64,
}

impl ConversionStats {
    /// Fill the per-page counters from page results.
    pub fn tally(&mut self, pages: &[PageResult]) {
        self.processed_pages = pages.iter().filter(|p| p.is_ok()).count();
        self.failed_pages = pages.len() - self.processed_pages;
        self.embedded_pages = pages
            .iter()
            .filter(|p| p.method == ExtractionMethod::Embedded)
            .count();
        self.ocr_pages = pages.iter().filter(|p| p.method.is_ocr()).count();
        self.resumed_pages = pages
            .iter()
            .filter(|p| p.method == ExtractionMethod::Resumed)
            .count();
        self.total_input_tokens = pages.iter().map(|p| p.input_tokens as u64).sum();
        self.total_output_tokens = pages.iter().map(|p| p.output_tokens as u64).sum();
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Merged, cleaned text.
    pub text: String,
    /// Per-page results in page order.
    pub pages: Vec<PageResult>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}
