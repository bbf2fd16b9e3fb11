//! Top-level conversion entry points.
//!
//! [`convert`] wires the production collaborators (pdfium, tesseract, an
//! `edgequake-llm` provider) and runs the whole pipeline. Callers that bring
//! their own collaborators use [`convert_with_engines`].

use crate::config::{OcrMode, PipelineConfig};
use crate::error::Pdf2TxtError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::llm::ProviderBackend;
use crate::pipeline::ocr::TesseractOcr;
use crate::pipeline::pdfium::shared_pdfium;
use crate::pipeline::source::PdfiumSource;
use crate::pipeline::workdir::WorkDir;
use crate::pipeline::{self, input, merge, render, split, ChatBackend, Engines, LocalOcr};
use edgequake_llm::{LLMProvider, ProviderFactory};
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Convert a PDF (or the first PDF in a directory) to cleaned text.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages failed under the
/// placeholder or skip policy (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(Pdf2TxtError)` only for fatal errors:
/// - Input not found / not a PDF / pdfium unavailable
/// - No LLM provider configured
/// - Every page failed, or a page failed under [`crate::FailedPagePolicy::Abort`]
pub async fn convert(
    input: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<ConversionOutput, Pdf2TxtError> {
    let pdf_path = input::resolve_input(input.as_ref())?;
    let pdfium = shared_pdfium(config.pdfium_lib_path.as_deref())?;
    let engines = production_engines(&pdfium, config).await?;
    run(&pdf_path, config, &pdfium, &engines).await
}

/// Like [`convert`], with caller-supplied collaborators.
///
/// pdfium is still bound for splitting; page reads, OCR and LLM calls all go
/// through `engines`.
pub async fn convert_with_engines(
    input: impl AsRef<Path>,
    config: &PipelineConfig,
    engines: &Engines,
) -> Result<ConversionOutput, Pdf2TxtError> {
    let pdf_path = input::resolve_input(input.as_ref())?;
    let pdfium = shared_pdfium(config.pdfium_lib_path.as_deref())?;
    run(&pdf_path, config, &pdfium, engines).await
}

/// Convert and write the merged text to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<ConversionStats, Pdf2TxtError> {
    let output = convert(input, config).await?;
    merge::write_atomic(output_path.as_ref(), &output.text).await?;
    info!("Wrote {}", output_path.as_ref().display());
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<ConversionOutput, Pdf2TxtError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2TxtError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// Read PDF metadata without converting anything.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input: impl AsRef<Path>,
    pdfium_lib: Option<&Path>,
) -> Result<DocumentMetadata, Pdf2TxtError> {
    let pdf_path = input::resolve_input(input.as_ref())?;
    let pdfium = shared_pdfium(pdfium_lib)?;
    read_metadata(&pdfium, &pdf_path).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    pdf_path: &Path,
    config: &PipelineConfig,
    pdfium: &Arc<Pdfium>,
    engines: &Engines,
) -> Result<ConversionOutput, Pdf2TxtError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", pdf_path.display());

    // ── Step 1: Metadata ─────────────────────────────────────────────────
    let metadata = read_metadata(pdfium, pdf_path).await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 2: Working directory ────────────────────────────────────────
    let work = match config.work_dir {
        Some(ref dir) => WorkDir::persistent(dir.join(document_stem(pdf_path)))?,
        None => WorkDir::temporary()?,
    };

    // ── Step 3: Split ────────────────────────────────────────────────────
    let split_start = Instant::now();
    let pages = split::split_pages(pdfium, pdf_path, &work, total_pages, config.resume).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;

    // ── Step 4: Extract + clean every page ───────────────────────────────
    let pipeline_start = Instant::now();
    let results = pipeline::process_pages(&pages, config, engines, &work).await?;
    let pipeline_duration_ms = pipeline_start.elapsed().as_millis() as u64;

    // ── Step 5: Merge ────────────────────────────────────────────────────
    let text = merge::merge_pages(&results, total_pages, config)?;

    let mut stats = ConversionStats {
        total_pages,
        split_duration_ms,
        pipeline_duration_ms,
        ..Default::default()
    };
    stats.tally(&results);
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete: {}/{} pages, {}ms total",
        stats.processed_pages, total_pages, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        text,
        pages: results,
        metadata,
        stats,
    })
}

async fn read_metadata(
    pdfium: &Arc<Pdfium>,
    pdf_path: &Path,
) -> Result<DocumentMetadata, Pdf2TxtError> {
    let pdfium = Arc::clone(pdfium);
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || render::extract_metadata_blocking(&pdfium, &path))
        .await
        .map_err(|e| Pdf2TxtError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn document_stem(pdf_path: &Path) -> PathBuf {
    pdf_path
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("document"))
}

/// pdfium page source, tesseract when installed, and LLM backends.
async fn production_engines(
    pdfium: &Arc<Pdfium>,
    config: &PipelineConfig,
) -> Result<Engines, Pdf2TxtError> {
    let source = Arc::new(PdfiumSource::new(
        Arc::clone(pdfium),
        config.dpi,
        config.max_rendered_pixels,
    ));

    let local_ocr: Option<Arc<dyn LocalOcr>> = if config.ocr_mode == OcrMode::Llm {
        None
    } else if TesseractOcr::probe(&config.tesseract_path).await {
        let ocr = TesseractOcr::new(&config.tesseract_path, &config.language);
        info!("Local OCR: tesseract ({})", ocr.language());
        Some(Arc::new(ocr))
    } else {
        warn!(
            "tesseract not found at '{}'; {}",
            config.tesseract_path.display(),
            match config.ocr_mode {
                OcrMode::Auto => "pages without text will use LLM OCR",
                _ => "pages without text will fail",
            }
        );
        None
    };

    let cleanup_provider = resolve_provider(config, &config.model)?;
    let ocr_provider = if config.effective_ocr_model() == config.model {
        Arc::clone(&cleanup_provider)
    } else {
        resolve_provider(config, config.effective_ocr_model())?
    };
    info!(
        "LLM models: cleanup {}, ocr {}",
        config.model,
        config.effective_ocr_model()
    );

    let cleanup_llm: Arc<dyn ChatBackend> = Arc::new(ProviderBackend::new(cleanup_provider));
    let ocr_llm: Arc<dyn ChatBackend> = Arc::new(ProviderBackend::new(ocr_provider));

    Ok(Engines {
        source,
        local_ocr,
        ocr_llm,
        cleanup_llm,
    })
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Pdf2TxtError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2TxtError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider for `model`, from most-specific to least-specific.
///
/// 1. **Named provider** (`config.provider_name`): the factory reads that
///    provider's API key from the environment.
/// 2. **OpenAI** when `OPENAI_API_KEY` is set, so users holding several keys
///    get OpenAI unless they ask otherwise.
/// 3. **Auto-detection** (`ProviderFactory::from_env`): first provider whose
///    key is present, with that provider's default model.
///
/// Runs once per conversion, before any page is touched; a missing key fails
/// the run instead of every page.
fn resolve_provider(
    config: &PipelineConfig,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2TxtError> {
    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2TxtError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, or pass --provider with that provider's key set.\n\
                Error: {}",
                e
            ),
        })?;
    warn!("No OPENAI_API_KEY; using the auto-detected provider with its default model");

    Ok(llm_provider)
}
