//! # edgequake-pdf2txt
//!
//! Turn a PDF into one cleaned plain-text file, page by page.
//!
//! Each page is split out into its own single-page PDF, its text is taken
//! from the embedded text layer (or OCR'd when there is none), an LLM
//! corrects OCR noise, broken hyphenation and stray line breaks, and the
//! cleaned pages are joined back together in page order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve a file, or the first PDF in a directory
//!  ├─ 2. Split    page_001.pdf, page_002.pdf, … (pdfium, spawn_blocking)
//!  ├─ 3. Extract  embedded text → tesseract → LLM OCR, per OCR mode
//!  ├─ 4. Clean    LLM correction + deterministic post-processing
//!  └─ 5. Merge    page-ordered join with a form-feed separator
//! ```
//!
//! Steps 3–4 run for up to `concurrency` pages at a time; per-page artifacts
//! land in the working directory so an interrupted run can `resume`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2txt::{convert, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider resolved from OPENAI_API_KEY (or --provider's key)
//!     let config = PipelineConfig::builder().language("es").build()?;
//!     let output = convert("informe.pdf", &config).await?;
//!     print!("{}", output.text);
//!     eprintln!("{} of {} pages cleaned",
//!         output.stats.processed_pages,
//!         output.stats.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2txt` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2txt = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! * **pdfium** shared library, found via `PDFIUM_LIB_PATH`, the current
//!   directory, or the system library path.
//! * **tesseract** (optional) with the language pack for `language`; without
//!   it, `auto` mode OCRs text-less pages with the LLM instead.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FailedPagePolicy, OcrMode, PageSeparator, PipelineConfig, PipelineConfigBuilder};
pub use convert::{convert, convert_sync, convert_to_file, convert_with_engines, inspect};
pub use error::{PageError, Pdf2TxtError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, ExtractionMethod, PageResult};
pub use pipeline::Engines;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
