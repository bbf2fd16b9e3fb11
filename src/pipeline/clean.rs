//! Page cleaner: LLM correction of one page's raw text.
//!
//! Output is model-dependent. Cleaning already-cleaned text is meant to be a
//! no-op but nothing here can guarantee that.

use crate::config::PipelineConfig;
use crate::error::PageError;
use crate::pipeline::llm::{chat_with_retry, cleanup_messages, ChatBackend};
use crate::pipeline::postprocess::clean_text;
use tracing::debug;

/// Cleaned text of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cleaned {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub retries: u32,
}

/// Correct `raw` with the cleanup model.
///
/// Blank input is not sent and yields empty text.
pub async fn clean_page(
    page_num: usize,
    raw: &str,
    config: &PipelineConfig,
    backend: &dyn ChatBackend,
) -> Result<Cleaned, PageError> {
    if raw.trim().is_empty() {
        debug!("Page {}: no text to clean", page_num);
        return Ok(Cleaned::default());
    }

    let messages = cleanup_messages(&config.language, raw);
    let outcome = chat_with_retry(backend, page_num, "cleanup", &messages, config)
        .await
        .map_err(|f| PageError::CleanupFailed {
            page: page_num,
            retries: f.retries,
            detail: f.detail,
        })?;

    Ok(Cleaned {
        text: clean_text(&outcome.reply.content),
        input_tokens: outcome.reply.input_tokens,
        output_tokens: outcome.reply.output_tokens,
        retries: outcome.retries,
    })
}
