//! Resilient reply generation.
//!
//! Wraps the external generative service in an explicit retry loop:
//! bounded attempts, exponential backoff with jitter capped at
//! `max_delay`, a per-attempt timeout independent of the backoff
//! delays, and a hard stop on safety blocks. Every terminal path
//! produces a [`ReplyResult`] — this module never returns an error for
//! a well-formed classification input.
//!
//! One call moves through `INIT → ATTEMPTING → {SUCCEEDED |
//! BLOCKED → DEGRADED | EXHAUSTED → DEGRADED}`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::types::{Category, Classification};
use crate::config::{FallbackTable, PromptConfig, RetryConfig};
use crate::error::GenerateError;
use crate::provider::{GenerationParams, GenerativeService};
use crate::reply::language::Lang;
use crate::reply::prompt::ReplyPromptBuilder;
use crate::reply::sanitize::OutputSanitizer;

/// Final outcome of one reply request. Immutable.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyResult {
    /// Reply text, generated or fallback.
    pub text: String,
    /// Language the reply is templated for.
    pub language: Lang,
    /// The classification the reply was built from.
    pub classification: Classification,
    /// Network attempts made (0 when no backend is configured).
    pub attempts: u32,
    /// True when `text` is a canned fallback rather than generated.
    pub degraded: bool,
}

/// Transient backoff bookkeeping, scoped to a single call.
struct RetryState {
    attempt: u32,
    next_delay: Duration,
}

impl RetryState {
    fn new(retry: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            next_delay: retry.initial_delay,
        }
    }

    /// Delay to sleep before the next attempt. A rate-limit hint from
    /// the service replaces the computed delay; either way the
    /// exponential schedule advances and stays capped at `max_delay`.
    fn backoff(&mut self, retry: &RetryConfig, hint: Option<Duration>) -> Duration {
        let base = hint.unwrap_or(self.next_delay).min(retry.max_delay);
        let capped = retry.max_delay.as_secs_f64();
        self.next_delay = Duration::from_secs_f64(
            (self.next_delay.as_secs_f64() * retry.multiplier).min(capped),
        );
        // Jitter to avoid thundering herds on a shared backend.
        base.mul_f64(0.5 + 0.5 * rand::random::<f64>())
    }
}

/// Generates replies with retry, safety and fallback policy.
pub struct ReplyOrchestrator {
    service: Option<Arc<dyn GenerativeService>>,
    prompts: ReplyPromptBuilder,
    sanitizer: OutputSanitizer,
    retry: RetryConfig,
    params: GenerationParams,
    fallbacks: FallbackTable,
}

impl ReplyOrchestrator {
    /// `service` may be `None` when no generative backend is wired;
    /// every reply then degrades to its fallback immediately.
    pub fn new(
        service: Option<Arc<dyn GenerativeService>>,
        prompts: PromptConfig,
        retry: RetryConfig,
        params: GenerationParams,
        fallbacks: FallbackTable,
    ) -> Self {
        Self {
            service,
            prompts: ReplyPromptBuilder::new(prompts),
            sanitizer: OutputSanitizer::new(),
            retry,
            params,
            fallbacks,
        }
    }

    /// Whether a generative backend is configured.
    pub fn is_ready(&self) -> bool {
        self.service.is_some()
    }

    /// Generate a reply for a classified message.
    ///
    /// Infallible by design: blocked, exhausted and unconfigured paths
    /// all resolve to a degraded fallback result.
    pub async fn generate(
        &self,
        message: &str,
        classification: &Classification,
        lang: Lang,
    ) -> ReplyResult {
        let Some(service) = &self.service else {
            debug!("No generative backend configured, using fallback reply");
            return self.fallback(classification, lang, 0);
        };

        let prompt = self.prompts.build(message, classification, lang);
        let mut state = RetryState::new(&self.retry);

        loop {
            state.attempt += 1;
            let attempt = state.attempt;

            let outcome = tokio::time::timeout(
                self.retry.attempt_timeout,
                service.generate(&prompt, &self.params),
            )
            .await;

            let err = match outcome {
                Ok(Ok(text)) => {
                    if !self.sanitizer.accepts(&text) {
                        warn!(attempt, "Reply rejected by validation, degrading");
                        return self.fallback(classification, lang, attempt);
                    }
                    let cleaned = self.sanitizer.sanitize(&text);
                    debug!(attempt, "Reply generated");
                    return ReplyResult {
                        text: self.prompts.finalize(&cleaned, lang),
                        language: lang,
                        classification: classification.clone(),
                        attempts: attempt,
                        degraded: false,
                    };
                }
                Ok(Err(err)) if !err.is_retryable() => {
                    warn!(attempt, reason = %err, "Reply blocked by safety policy, degrading");
                    return self.fallback(classification, lang, attempt);
                }
                Ok(Err(err)) => err,
                Err(_elapsed) => GenerateError::Transient {
                    reason: format!(
                        "attempt timed out after {:?}",
                        self.retry.attempt_timeout
                    ),
                },
            };

            if attempt > self.retry.max_retries {
                warn!(
                    attempts = attempt,
                    error = %err,
                    "Reply generation exhausted retries, degrading"
                );
                return self.fallback(classification, lang, attempt);
            }

            let hint = match &err {
                GenerateError::RateLimited { retry_after } => *retry_after,
                _ => None,
            };
            let delay = state.backoff(&self.retry, hint);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Reply attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Deterministic, category-appropriate canned reply.
    fn fallback(&self, classification: &Classification, lang: Lang, attempts: u32) -> ReplyResult {
        let text = self.fallback_text(classification.category, lang);
        ReplyResult {
            text,
            language: lang,
            classification: classification.clone(),
            attempts,
            degraded: true,
        }
    }

    fn fallback_text(&self, category: Category, lang: Lang) -> String {
        self.fallbacks
            .get(&lang)
            .or_else(|| self.fallbacks.get(&Lang::Fr))
            .and_then(|per_lang| per_lang.get(&category))
            .cloned()
            .unwrap_or_else(|| {
                "Merci pour votre message. Nous vous répondrons prochainement.".to_string()
            })
    }
}
