//! Page extractor: raw text for one page according to the OCR mode.

use crate::config::{OcrMode, PipelineConfig};
use crate::error::PageError;
use crate::output::ExtractionMethod;
use crate::pipeline::encode::encode_page;
use crate::pipeline::llm::{chat_with_retry, ocr_messages};
use crate::pipeline::workdir::PageFile;
use crate::pipeline::Engines;
use edgequake_llm::ImageData;
use tracing::{debug, warn};

/// Raw text for one page and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub retries: u32,
}

impl Extraction {
    fn local(text: String, method: ExtractionMethod) -> Self {
        Self {
            text,
            method,
            input_tokens: 0,
            output_tokens: 0,
            retries: 0,
        }
    }
}

/// Extract page `pos` of `pages`.
///
/// `pages` is the whole document so LLM OCR can render the neighbours.
pub async fn extract_page(
    pages: &[PageFile],
    pos: usize,
    config: &PipelineConfig,
    engines: &Engines,
) -> Result<Extraction, PageError> {
    let page = &pages[pos];
    let page_num = page.page_num();

    if config.ocr_mode == OcrMode::Llm {
        return llm_ocr(pages, pos, config, engines).await;
    }

    let embedded = match engines.source.embedded_text(page).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Page {}: embedded text unreadable ({}), trying OCR", page_num, e);
            String::new()
        }
    };
    if has_enough_text(&embedded, config.min_text_chars) {
        debug!("Page {}: using embedded text ({} bytes)", page_num, embedded.len());
        return Ok(Extraction::local(embedded, ExtractionMethod::Embedded));
    }

    match (&engines.local_ocr, config.ocr_mode) {
        (Some(ocr), _) => {
            let image = engines
                .source
                .render(page)
                .await
                .map_err(|detail| PageError::ExtractionFailed { page: page_num, detail })?;
            let text = ocr.recognise(&image).await.map_err(|e| PageError::ExtractionFailed {
                page: page_num,
                detail: format!("local OCR: {}", e),
            })?;
            debug!("Page {}: local OCR produced {} bytes", page_num, text.len());
            Ok(Extraction::local(text, ExtractionMethod::LocalOcr))
        }
        (None, OcrMode::Auto) => {
            debug!("Page {}: no local OCR engine, falling back to LLM OCR", page_num);
            llm_ocr(pages, pos, config, engines).await
        }
        (None, _) => Err(PageError::OcrUnavailable { page: page_num }),
    }
}

/// True when `text` has at least `min` non-whitespace characters.
fn has_enough_text(text: &str, min: usize) -> bool {
    text.chars().filter(|c| !c.is_whitespace()).take(min.max(1)).count() >= min.max(1)
}

async fn llm_ocr(
    pages: &[PageFile],
    pos: usize,
    config: &PipelineConfig,
    engines: &Engines,
) -> Result<Extraction, PageError> {
    let page_num = pages[pos].page_num();

    let current = render_encoded(&pages[pos], engines)
        .await
        .map_err(|detail| PageError::ExtractionFailed { page: page_num, detail })?;

    let neighbour = |idx: Option<usize>| async move {
        let page = idx.and_then(|i| pages.get(i))?;
        match render_encoded(page, engines).await {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(
                    "Page {}: context page {} omitted: {}",
                    page_num,
                    page.page_num(),
                    e
                );
                None
            }
        }
    };
    let previous = neighbour(pos.checked_sub(1)).await;
    let next = neighbour(Some(pos + 1)).await;

    let messages = ocr_messages(&config.language, previous, current, next);
    let outcome = chat_with_retry(engines.ocr_llm.as_ref(), page_num, "ocr", &messages, config)
        .await
        .map_err(|f| PageError::ExtractionFailed {
            page: page_num,
            detail: format!("LLM OCR failed after {} retries: {}", f.retries, f.detail),
        })?;

    Ok(Extraction {
        text: outcome.reply.content.trim().to_string(),
        method: ExtractionMethod::LlmOcr,
        input_tokens: outcome.reply.input_tokens,
        output_tokens: outcome.reply.output_tokens,
        retries: outcome.retries,
    })
}

async fn render_encoded(page: &PageFile, engines: &Engines) -> Result<ImageData, String> {
    let image = engines.source.render(page).await?;
    encode_page(&image).map_err(|e| format!("image encoding failed: {}", e))
}
