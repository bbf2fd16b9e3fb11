//! LLM interaction: OCR and cleanup requests with retry/backoff.
//!
//! All prompt text lives in [`crate::prompts`]; this module builds messages,
//! applies the per-call timeout, and retries.
//!
//! ## Retry Strategy
//!
//! Every failure (API error or timeout) is retried up to `max_retries` times
//! with exponential backoff `retry_backoff_ms * 2^(attempt-1)`. With the
//! defaults (1 500 ms, 4 retries) the waits are 1.5 s → 3 s → 6 s → 12 s.

use crate::config::PipelineConfig;
use crate::prompts::{
    cleanup_system_prompt, ocr_instruction, CURRENT_PAGE_LABEL, NEXT_PAGE_LABEL,
    OCR_SYSTEM_PROMPT, PREVIOUS_PAGE_LABEL,
};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Text and token usage of one completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// One chat completion against some model.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatReply, String>;
}

/// [`ChatBackend`] over an `edgequake-llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatReply, String> {
        let response = self
            .provider
            .chat(messages, Some(options))
            .await
            .map_err(|e| e.to_string())?;
        Ok(ChatReply {
            content: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

/// A successful call and the retries it took.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub reply: ChatReply,
    pub retries: u32,
}

/// The last error after all attempts were spent.
#[derive(Debug, Clone)]
pub struct CallFailure {
    pub detail: String,
    pub retries: u32,
}

/// Run `messages` against `backend`, retrying per the configured policy.
///
/// `purpose` only labels log lines ("cleanup", "ocr").
pub async fn chat_with_retry(
    backend: &dyn ChatBackend,
    page_num: usize,
    purpose: &str,
    messages: &[ChatMessage],
    config: &PipelineConfig,
) -> Result<CallOutcome, CallFailure> {
    let options = build_options(config);
    let mut last_err = String::from("Unknown error");

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Page {}: {} retry {}/{} after {}ms",
                page_num, purpose, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = backend.chat(messages, &options);
        let result = if config.api_timeout_secs == 0 {
            call.await
        } else {
            match timeout(Duration::from_secs(config.api_timeout_secs), call).await {
                Ok(r) => r,
                Err(_) => Err(format!("timed out after {}s", config.api_timeout_secs)),
            }
        };

        match result {
            Ok(reply) => {
                debug!(
                    "Page {}: {} used {} input / {} output tokens",
                    page_num, purpose, reply.input_tokens, reply.output_tokens
                );
                return Ok(CallOutcome {
                    reply,
                    retries: attempt,
                });
            }
            Err(e) => {
                warn!(
                    "Page {}: {} attempt {} failed: {}",
                    page_num,
                    purpose,
                    attempt + 1,
                    e
                );
                last_err = e;
            }
        }
    }

    Err(CallFailure {
        detail: last_err,
        retries: config.max_retries,
    })
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Messages for cleaning one page of raw text.
pub fn cleanup_messages(language: &str, raw_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(cleanup_system_prompt(language)),
        ChatMessage::user(raw_text),
    ]
}

/// Messages for transcribing `current`, with optional neighbour pages as context.
///
/// Each image travels in its own user message headed by its label, so the
/// model can tell the page to transcribe from the context pages.
pub fn ocr_messages(
    language: &str,
    previous: Option<ImageData>,
    current: ImageData,
    next: Option<ImageData>,
) -> Vec<ChatMessage> {
    let mut messages = vec![
        ChatMessage::system(OCR_SYSTEM_PROMPT),
        ChatMessage::user(ocr_instruction(language)),
    ];
    if let Some(prev) = previous {
        messages.push(ChatMessage::user_with_images(PREVIOUS_PAGE_LABEL, vec![prev]));
    }
    messages.push(ChatMessage::user_with_images(CURRENT_PAGE_LABEL, vec![current]));
    if let Some(next) = next {
        messages.push(ChatMessage::user_with_images(NEXT_PAGE_LABEL, vec![next]));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyBackend {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for FlakyBackend {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<ChatReply, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err("503 Service Unavailable".into());
            }
            Ok(ChatReply {
                content: "ok".into(),
                input_tokens: 3,
                output_tokens: 1,
            })
        }
    }

    fn fast_config(max_retries: u32) -> PipelineConfig {
        PipelineConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    #[test]
    fn build_options_uses_config() {
        let opts = build_options(&PipelineConfig::default());
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 4), 4000);
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let backend = FlakyBackend {
            failures_left: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        };
        let out = chat_with_retry(&backend, 1, "cleanup", &[], &fast_config(3))
            .await
            .unwrap();
        assert_eq!(out.reply.content, "ok");
        assert_eq!(out.retries, 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_report_last_error() {
        let backend = FlakyBackend {
            failures_left: AtomicUsize::new(10),
            calls: AtomicUsize::new(0),
        };
        let err = chat_with_retry(&backend, 1, "cleanup", &[], &fast_config(2))
            .await
            .unwrap_err();
        assert_eq!(err.retries, 2);
        assert!(err.detail.contains("503"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_call_times_out_as_a_failed_attempt() {
        struct Slow;

        #[async_trait]
        impl ChatBackend for Slow {
            async fn chat(
                &self,
                _messages: &[ChatMessage],
                _options: &CompletionOptions,
            ) -> Result<ChatReply, String> {
                sleep(Duration::from_secs(3600)).await;
                Ok(ChatReply::default())
            }
        }

        let config = PipelineConfig::builder()
            .max_retries(0)
            .api_timeout_secs(1)
            .build()
            .unwrap();
        let err = chat_with_retry(&Slow, 4, "ocr", &[], &config).await.unwrap_err();
        assert!(err.detail.contains("timed out after 1s"));
    }

    #[test]
    fn ocr_messages_label_each_image() {
        let img = || ImageData::new("AAAA", "image/png");
        let with_neighbours = ocr_messages("es", Some(img()), img(), Some(img()));
        assert_eq!(with_neighbours.len(), 5);

        let first_page = ocr_messages("es", None, img(), Some(img()));
        assert_eq!(first_page.len(), 4);
        assert_eq!(first_page[2].content, CURRENT_PAGE_LABEL);
    }

    #[test]
    fn cleanup_messages_carry_raw_text() {
        let m = cleanup_messages("es", "texto crudo");
        assert_eq!(m.len(), 2);
        assert_eq!(m[1].content, "texto crudo");
        assert!(m[0].content.contains("Spanish"));
    }
}
