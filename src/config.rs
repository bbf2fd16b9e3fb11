//! Configuration types for PDF-to-text cleanup runs.
//!
//! Every knob lives in [`PipelineConfig`], built once via its
//! [`PipelineConfigBuilder`] and passed by reference to each pipeline stage.
//! Nothing below the binary reads the process environment; the CLI maps its
//! flags and environment variables onto this struct and hands it over.

use crate::error::Pdf2TxtError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default cleanup model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default OCR / cleanup language (ISO 639-1).
pub const DEFAULT_LANGUAGE: &str = "es";

/// Configuration for a PDF-to-text run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2txt::{OcrMode, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .ocr_mode(OcrMode::Llm)
///     .concurrency(4)
///     .language("fr")
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_ocr_model(), "gpt-4o-mini");
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// How each page's raw text is obtained. Default: [`OcrMode::Auto`].
    pub ocr_mode: OcrMode,

    /// Language of the document as an ISO 639-1 code. Default: `es`.
    ///
    /// Drives the tesseract language pack and the cleanup prompt.
    pub language: String,

    /// Model used for text cleanup. Default: `gpt-4o-mini`.
    pub model: String,

    /// Model used for LLM OCR. Falls back to [`Self::model`] when `None`.
    pub ocr_model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is auto-detected at startup.
    pub provider_name: Option<String>,

    /// Maximum number of pages in flight at once. Default: 6.
    pub concurrency: usize,

    /// Maximum tokens the LLM may generate per page. Default: 2048.
    pub max_tokens: usize,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Retries per LLM call on failure. Default: 4.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled on each attempt. Default: 1500.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Rendering DPI for OCR images. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Cap on the longest rendered edge in pixels. Default: 2500.
    pub max_rendered_pixels: u32,

    /// Minimum non-whitespace characters for the embedded text layer to count
    /// as present. Default: 1.
    pub min_text_chars: usize,

    /// Working directory for `pages/`, `raw/` and `clean/` artifacts.
    ///
    /// When `None` a temporary directory is used and removed after the run.
    pub work_dir: Option<PathBuf>,

    /// Reuse artifacts already present in [`Self::work_dir`]. Default: false.
    pub resume: bool,

    /// What the merged file contains for a failed page.
    pub on_page_failure: FailedPagePolicy,

    /// Page separator in the merged output. Default: form feed.
    pub page_separator: PageSeparator,

    /// `tesseract` executable used for local OCR. Default: `tesseract` on `PATH`.
    pub tesseract_path: PathBuf,

    /// Explicit pdfium shared library. When `None`, pdfium is bound from the
    /// system library search path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_mode: OcrMode::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            ocr_model: None,
            provider_name: None,
            concurrency: 6,
            max_tokens: 2048,
            temperature: 0.0,
            max_retries: 4,
            retry_backoff_ms: 1500,
            api_timeout_secs: 120,
            dpi: 200,
            max_rendered_pixels: 2500,
            min_text_chars: 1,
            work_dir: None,
            resume: false,
            on_page_failure: FailedPagePolicy::default(),
            page_separator: PageSeparator::default(),
            tesseract_path: PathBuf::from("tesseract"),
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("ocr_mode", &self.ocr_mode)
            .field("language", &self.language)
            .field("model", &self.model)
            .field("ocr_model", &self.ocr_model)
            .field("provider_name", &self.provider_name)
            .field("concurrency", &self.concurrency)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("dpi", &self.dpi)
            .field("work_dir", &self.work_dir)
            .field("resume", &self.resume)
            .field("on_page_failure", &self.on_page_failure)
            .field("page_separator", &self.page_separator)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model used for LLM OCR.
    pub fn effective_ocr_model(&self) -> &str {
        self.ocr_model.as_deref().unwrap_or(&self.model)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn ocr_mode(mut self, mode: OcrMode) -> Self {
        self.config.ocr_mode = mode;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n.max(1);
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn resume(mut self, v: bool) -> Self {
        self.config.resume = v;
        self
    }

    pub fn on_page_failure(mut self, policy: FailedPagePolicy) -> Self {
        self.config.on_page_failure = policy;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Pdf2TxtError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Pdf2TxtError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Pdf2TxtError::InvalidConfig("Model must not be empty".into()));
        }
        if c.language.trim().is_empty() {
            return Err(Pdf2TxtError::InvalidConfig(
                "Language must not be empty".into(),
            ));
        }
        if c.resume && c.work_dir.is_none() {
            return Err(Pdf2TxtError::InvalidConfig(
                "Resume needs a working directory to resume from".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a page's raw text is obtained.
///
/// | Mode | Embedded text present | Embedded text missing |
/// |------|-----------------------|-----------------------|
/// | `auto`  | embedded | local OCR, else LLM OCR when no local engine |
/// | `local` | embedded | local OCR, page fails when no local engine |
/// | `llm`   | LLM OCR with previous/next page context | LLM OCR |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    #[default]
    Auto,
    Local,
    Llm,
}

impl FromStr for OcrMode {
    type Err = Pdf2TxtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(OcrMode::Auto),
            "local" => Ok(OcrMode::Local),
            "llm" => Ok(OcrMode::Llm),
            other => Err(Pdf2TxtError::InvalidConfig(format!(
                "Unknown OCR mode '{other}' (expected auto, local or llm)"
            ))),
        }
    }
}

impl fmt::Display for OcrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OcrMode::Auto => "auto",
            OcrMode::Local => "local",
            OcrMode::Llm => "llm",
        };
        f.write_str(s)
    }
}

/// What the merged output contains for a page that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedPagePolicy {
    /// Keep the slot with a `[page N: reason]` marker. (default)
    #[default]
    Placeholder,
    /// Omit the page from the merged output.
    Skip,
    /// Stop the run on the first failed page, cancelling in-flight pages.
    Abort,
}

impl FromStr for FailedPagePolicy {
    type Err = Pdf2TxtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "placeholder" => Ok(FailedPagePolicy::Placeholder),
            "skip" => Ok(FailedPagePolicy::Skip),
            "abort" => Ok(FailedPagePolicy::Abort),
            other => Err(Pdf2TxtError::InvalidConfig(format!(
                "Unknown page-failure policy '{other}' (expected placeholder, skip or abort)"
            ))),
        }
    }
}

/// How to separate pages in the merged text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// A form feed on its own line: "\n\x0C\n". (default)
    ///
    /// Cleaned page text never contains form feeds, so splitting the merged
    /// output on this separator recovers exactly one segment per page.
    #[default]
    FormFeed,
    /// A blank line: "\n\n".
    BlankLine,
    /// A numbered marker line: "--- page N ---".
    Marker,
    /// Custom string inserted between pages on its own line.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::FormFeed => "\n\u{000C}\n".to_string(),
            PageSeparator::BlankLine => "\n\n".to_string(),
            PageSeparator::Marker => format!("\n\n--- page {} ---\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n{}\n", s),
        }
    }

    /// Parse the CLI spelling: `formfeed`, `blank`, `marker`, or any custom string.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "formfeed" | "ff" => PageSeparator::FormFeed,
            "blank" | "none" => PageSeparator::BlankLine,
            "marker" => PageSeparator::Marker,
            _ => PageSeparator::Custom(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PipelineConfig::default();
        assert_eq!(c.ocr_mode, OcrMode::Auto);
        assert_eq!(c.language, "es");
        assert_eq!(c.model, "gpt-4o-mini");
        assert_eq!(c.concurrency, 6);
        assert_eq!(c.max_tokens, 2048);
        assert_eq!(c.on_page_failure, FailedPagePolicy::Placeholder);
        assert_eq!(c.page_separator, PageSeparator::FormFeed);
    }

    #[test]
    fn ocr_model_falls_back_to_cleanup_model() {
        let c = PipelineConfig::builder().model("gpt-4.1").build().unwrap();
        assert_eq!(c.effective_ocr_model(), "gpt-4.1");

        let c = PipelineConfig::builder()
            .model("gpt-4.1")
            .ocr_model("gpt-4o")
            .build()
            .unwrap();
        assert_eq!(c.effective_ocr_model(), "gpt-4o");
    }

    #[test]
    fn resume_without_work_dir_is_rejected() {
        let err = PipelineConfig::builder().resume(true).build().unwrap_err();
        assert!(matches!(err, Pdf2TxtError::InvalidConfig(_)));

        assert!(PipelineConfig::builder()
            .resume(true)
            .work_dir("/tmp/work")
            .build()
            .is_ok());
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let c = PipelineConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn ocr_mode_parses_case_insensitively() {
        assert_eq!("AUTO".parse::<OcrMode>().unwrap(), OcrMode::Auto);
        assert_eq!(" local ".parse::<OcrMode>().unwrap(), OcrMode::Local);
        assert_eq!("llm".parse::<OcrMode>().unwrap(), OcrMode::Llm);
        assert!("tesseract".parse::<OcrMode>().is_err());
    }

    #[test]
    fn failed_page_policy_parses() {
        assert_eq!(
            "skip".parse::<FailedPagePolicy>().unwrap(),
            FailedPagePolicy::Skip
        );
        assert!("retry".parse::<FailedPagePolicy>().is_err());
    }

    #[test]
    fn separator_rendering() {
        assert_eq!(PageSeparator::FormFeed.render(2), "\n\u{c}\n");
        assert_eq!(PageSeparator::Marker.render(3), "\n\n--- page 3 ---\n\n");
        assert_eq!(PageSeparator::parse("***"), PageSeparator::Custom("***".into()));
        assert_eq!(PageSeparator::parse("blank"), PageSeparator::BlankLine);
    }
}
