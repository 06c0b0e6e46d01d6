//! Model interaction: ask the provider for a checklist draft.
//!
//! This module is intentionally thin. All prompt wording lives in
//! [`crate::prompts`] so it can change without touching retry or timeout
//! handling here.
//!
//! ## Retry Strategy
//!
//! Transient 429 / 5xx failures and per-call timeouts are retried with
//! exponential backoff (`retry_backoff_ms * 2^(attempt-1)`): with a 500 ms
//! base and 2 retries the waits are 500 ms then 1 s.

use crate::config::CasePackConfig;
use crate::error::CasePackError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A raw checklist completion plus call statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChecklistDraft {
    /// Completion text exactly as returned.
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub retries: u32,
    pub duration_ms: u64,
}

/// Send the case prompt and return the model's checklist.
///
/// ## Message Layout
///
/// 1. **System message**: output rules (or the configured override)
/// 2. **User message**: the case facts from [`crate::prompts::checklist_prompt`]
///
/// An empty or whitespace-only completion counts as a failed attempt; when
/// it is the last thing the provider returned the error is
/// [`CasePackError::EmptyCompletion`].
pub async fn draft_checklist(
    provider: &Arc<dyn LLMProvider>,
    user_prompt: &str,
    config: &CasePackConfig,
) -> Result<ChecklistDraft, CasePackError> {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt),
    ];
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<CasePackError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Checklist draft: retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) if !response.content.trim().is_empty() => {
                let duration = start.elapsed();
                debug!(
                    "Checklist draft: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens, response.completion_tokens, duration
                );
                return Ok(ChecklistDraft {
                    text: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    retries: attempt,
                    duration_ms: duration.as_millis() as u64,
                });
            }
            Ok(Ok(_)) => {
                warn!("Checklist draft: attempt {} returned no text", attempt + 1);
                last_err = Some(CasePackError::EmptyCompletion);
            }
            Ok(Err(e)) => {
                let msg = e.to_string();
                warn!("Checklist draft: attempt {} failed: {}", attempt + 1, msg);
                last_err = Some(CasePackError::LlmApiError {
                    retries: attempt,
                    message: msg,
                });
            }
            Err(_) => {
                warn!(
                    "Checklist draft: attempt {} timed out after {}s",
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(CasePackError::ApiTimeout {
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    Err(match last_err {
        Some(CasePackError::LlmApiError { message, .. }) => CasePackError::LlmApiError {
            retries: config.max_retries,
            message,
        },
        Some(other) => other,
        None => CasePackError::Internal("no model attempt was made".into()),
    })
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Build `CompletionOptions` from the package config.
fn build_options(config: &CasePackConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::MockProvider;

    fn fast_config(max_retries: u32) -> CasePackConfig {
        CasePackConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    async fn mock_with(responses: &[&str]) -> Arc<dyn LLMProvider> {
        let mock = MockProvider::new();
        for r in responses {
            mock.add_response(*r).await;
        }
        Arc::new(mock)
    }

    #[tokio::test]
    async fn first_answer_is_returned() {
        let provider = mock_with(&["Forms:\n- I-130"]).await;
        let draft = draft_checklist(&provider, "case", &fast_config(2))
            .await
            .unwrap();
        assert_eq!(draft.text, "Forms:\n- I-130");
        assert_eq!(draft.retries, 0);
    }

    #[tokio::test]
    async fn blank_completion_is_retried() {
        let provider = mock_with(&["   ", "Forms:\n- I-130"]).await;
        let draft = draft_checklist(&provider, "case", &fast_config(2))
            .await
            .unwrap();
        assert_eq!(draft.text, "Forms:\n- I-130");
        assert_eq!(draft.retries, 1);
    }

    #[tokio::test]
    async fn blank_on_every_attempt_is_empty_completion() {
        let provider = mock_with(&["", " \n ", "\t"]).await;
        let err = draft_checklist(&provider, "case", &fast_config(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CasePackError::EmptyCompletion));
    }

    #[tokio::test]
    async fn no_retries_means_one_attempt() {
        // The second queued answer is never requested.
        let provider = mock_with(&["", "Forms:"]).await;
        let err = draft_checklist(&provider, "case", &fast_config(0))
            .await
            .unwrap_err();
        assert!(matches!(err, CasePackError::EmptyCompletion));
    }

    #[test]
    fn build_options_defaults() {
        let config = CasePackConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.4));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(u64::MAX, 5), u64::MAX);
    }
}
