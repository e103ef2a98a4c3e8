//! Summarizer: turn a transcript into the dispatcher message via an LLM.
//!
//! This sits outside the extraction core. It receives a non-empty transcript
//! and returns the provider's reply, trimmed. All prompt text lives in
//! [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! Transient provider errors (429 / 503) are retried with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`). With the defaults (500 ms,
//! 2 retries) the wait sequence is 500 ms → 1 s.

use crate::config::SummaryConfig;
use crate::error::ExtractError;
use crate::prompts::{build_summary_prompt, is_valid_template};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Anything that can turn a transcript into a dispatch summary.
///
/// The future is boxed so the trait stays object-safe and can be shared as
/// `Arc<dyn Summarizer>`.
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(&'a self, transcript: &'a str) -> BoxFuture<'a, Result<String, ExtractError>>;
}

/// [`Summarizer`] backed by an `edgequake_llm` provider.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    config: SummaryConfig,
}

impl std::fmt::Debug for LlmSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSummarizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LlmSummarizer {
    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: SummaryConfig) -> Result<Self, ExtractError> {
        if let Some(ref template) = config.prompt_template {
            if !is_valid_template(template) {
                return Err(ExtractError::InvalidConfig(
                    "Summary prompt template must contain {text}".into(),
                ));
            }
        }
        let provider = resolve_provider(&config)?;
        Ok(Self { provider, config })
    }

    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: SummaryConfig) -> Self {
        Self { provider, config }
    }

    async fn run(&self, transcript: &str) -> Result<String, ExtractError> {
        let start = Instant::now();
        let prompt = build_summary_prompt(self.config.prompt_template.as_deref(), transcript);
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(&self.config);

        let mut last_err: Option<String> = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.config.retry_backoff_ms, attempt);
                warn!(
                    "Summary retry {}/{} after {}ms",
                    attempt, self.config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Summary: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content.trim().to_string());
                }
                Err(e) => {
                    warn!("Summary attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e.to_string());
                }
            }
        }

        Err(ExtractError::SummaryFailed {
            attempts: self.config.max_retries + 1,
            message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

impl Summarizer for LlmSummarizer {
    fn summarize<'a>(&'a self, transcript: &'a str) -> BoxFuture<'a, Result<String, ExtractError>> {
        Box::pin(self.run(transcript))
    }
}

fn build_options(config: &SummaryConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    info!("Summarizer: {} / {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **`OPENAI_API_KEY`** present: OpenAI with the configured model or
///    [`DEFAULT_MODEL`].
/// 4. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &SummaryConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edgequake_llm::{LLMResponse, LlmError, MockProvider};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&SummaryConfig::default());
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
    }

    /// Fails the first `failures` calls, then answers with `reply`.
    struct FlakyProvider {
        failures: u32,
        reply: String,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failures: u32, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                failures,
                reply: reply.to_string(),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "flaky-model"
        }

        fn max_context_length(&self) -> usize {
            4096
        }

        async fn complete(&self, prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            self.chat(&[ChatMessage::user(prompt)], None).await
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.chat(&[ChatMessage::user(prompt)], Some(options)).await
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(LlmError::RateLimited(format!("429 on call {}", n + 1)));
            }
            Ok(LLMResponse::new(self.reply.clone(), "flaky-model"))
        }
    }

    fn fast_retries(max_retries: u32) -> SummaryConfig {
        SummaryConfig {
            max_retries,
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let mock = MockProvider::new();
        mock.add_response("\n  Load# 4471\nRate: $1,850  \n\n").await;
        let summarizer = LlmSummarizer::with_provider(Arc::new(mock), SummaryConfig::default());

        let summary = summarizer.summarize("transcript").await.unwrap();
        assert_eq!(summary, "Load# 4471\nRate: $1,850");
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let provider = FlakyProvider::new(2, "  ok  ");
        let summarizer = LlmSummarizer::with_provider(provider.clone(), fast_retries(2));

        let summary = summarizer.summarize("transcript").await.unwrap();
        assert_eq!(summary, "ok");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let provider = FlakyProvider::new(u32::MAX, "never");
        let summarizer = LlmSummarizer::with_provider(provider.clone(), fast_retries(2));

        let err = summarizer.summarize("transcript").await.unwrap_err();
        match err {
            ExtractError::SummaryFailed { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("429 on call 3"), "{message}");
            }
            other => panic!("expected SummaryFailed, got {other:?}"),
        }
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let provider = FlakyProvider::new(1, "late");
        let summarizer = LlmSummarizer::with_provider(provider.clone(), fast_retries(0));

        let err = summarizer.summarize("transcript").await.unwrap_err();
        assert!(matches!(err, ExtractError::SummaryFailed { attempts: 1, .. }));
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let config = SummaryConfig {
            prompt_template: Some("summarise this".into()),
            ..Default::default()
        };
        let err = LlmSummarizer::from_config(config).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }
}
