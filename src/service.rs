//! Service facade composing the full pipeline.
//!
//! `classify` runs normalize → override → cache(model); `classify_and_reply`
//! continues into language detection and the reply orchestrator. The
//! only shared mutable state outside the cache is the stats counters,
//! updated atomically per request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::classify::cache::PredictionCache;
use crate::classify::engine::PredictionEngine;
use crate::classify::normalize::normalize;
use crate::classify::overrides::OverrideMatcher;
use crate::classify::types::{Classification, Source};
use crate::config::TriageConfig;
use crate::error::{ClassifyError, ConfigError};
use crate::provider::{GenerativeService, ScoreModel};
use crate::reply::language::{Lang, LanguageDetector};
use crate::reply::orchestrator::{ReplyOrchestrator, ReplyResult};

/// Aggregate request counters. Append-only atomics.
#[derive(Default)]
struct Counters {
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    cache_hits: AtomicU64,
    override_hits: AtomicU64,
    degraded_replies: AtomicU64,
    total_latency_micros: AtomicU64,
}

/// Point-in-time view of the service counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub override_hits: u64,
    pub degraded_replies: u64,
    /// Fraction of requests that classified successfully, in `[0, 1]`.
    pub success_rate: f64,
    pub avg_latency: Duration,
    pub as_of: DateTime<Utc>,
}

/// Classification + reply service.
pub struct TriageService {
    overrides: OverrideMatcher,
    engine: PredictionEngine,
    cache: PredictionCache,
    replier: ReplyOrchestrator,
    detector: LanguageDetector,
    counters: Counters,
}

impl TriageService {
    /// Build the full pipeline from a validated configuration.
    ///
    /// `generative` is optional: without it, `classify_and_reply` still
    /// works but every reply is a degraded fallback.
    pub fn new(
        config: TriageConfig,
        model: Arc<dyn ScoreModel>,
        generative: Option<Arc<dyn GenerativeService>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let overrides = OverrideMatcher::new(&config.overrides, &config.priority);
        let engine = PredictionEngine::new(model, &config.prompts, &config.priority);
        let cache = PredictionCache::new(config.cache.capacity);
        let replier = ReplyOrchestrator::new(
            generative,
            config.prompts,
            config.retry,
            config.generation,
            config.fallbacks,
        );

        info!(
            cache_capacity = config.cache.capacity,
            reply_backend = replier.is_ready(),
            "Triage service initialized"
        );

        Ok(Self {
            overrides,
            engine,
            cache,
            replier,
            detector: LanguageDetector::new(),
            counters: Counters::default(),
        })
    }

    /// Classify one raw message.
    pub fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let start = Instant::now();
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);

        let result = self.classify_inner(text);

        match &result {
            Ok(classification) => {
                match classification.source {
                    Source::Cache => {
                        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    }
                    Source::Override => {
                        self.counters.override_hits.fetch_add(1, Ordering::Relaxed);
                    }
                    Source::Model => {}
                }
                debug!(
                    category = %classification.category,
                    confidence = classification.confidence,
                    source = ?classification.source,
                    "Message classified"
                );
            }
            Err(err) => {
                self.counters.failed_requests.fetch_add(1, Ordering::Relaxed);
                debug!(error = %err, "Classification failed");
            }
        }

        self.counters
            .total_latency_micros
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        result
    }

    fn classify_inner(&self, text: &str) -> Result<Classification, ClassifyError> {
        let normalized = normalize(text)?;
        let start = Instant::now();

        // Overrides terminate before the cache: deterministic rules are
        // cheaper than a lookup and never stored.
        if let Some(category) = self.overrides.matches(&normalized) {
            return Ok(OverrideMatcher::classification_for(
                category,
                start.elapsed(),
            ));
        }

        self.cache
            .get_or_compute(&normalized, || self.engine.classify(&normalized))
    }

    /// Classify a message and generate a reply in the detected (or
    /// declared) language. Classification errors propagate; reply
    /// failures degrade to a fallback and never error.
    pub async fn classify_and_reply(
        &self,
        text: &str,
        language: Option<Lang>,
    ) -> Result<ReplyResult, ClassifyError> {
        let classification = self.classify(text)?;
        let lang = language.unwrap_or_else(|| self.detector.detect(text));

        let reply = self.replier.generate(text, &classification, lang).await;
        if reply.degraded {
            self.counters.degraded_replies.fetch_add(1, Ordering::Relaxed);
        }
        Ok(reply)
    }

    /// Snapshot the aggregate statistics.
    pub fn stats(&self) -> StatsSnapshot {
        let total = self.counters.total_requests.load(Ordering::Relaxed);
        let failed = self.counters.failed_requests.load(Ordering::Relaxed);
        let latency = self.counters.total_latency_micros.load(Ordering::Relaxed);

        StatsSnapshot {
            total_requests: total,
            failed_requests: failed,
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            override_hits: self.counters.override_hits.load(Ordering::Relaxed),
            degraded_replies: self.counters.degraded_replies.load(Ordering::Relaxed),
            success_rate: if total == 0 {
                1.0
            } else {
                (total - failed.min(total)) as f64 / total as f64
            },
            avg_latency: if total == 0 {
                Duration::ZERO
            } else {
                Duration::from_micros(latency / total)
            },
            as_of: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::types::Category;
    use crate::provider::LexiconModel;

    fn service() -> TriageService {
        let config = TriageConfig::default();
        let model = Arc::new(LexiconModel::new(config.lexicon.clone()));
        TriageService::new(config, model, None).unwrap()
    }

    #[test]
    fn override_hit_is_counted_and_sourced() {
        let s = service();
        let c = s.classify("Bug page paiement").unwrap();
        assert_eq!(c.category, Category::Technical);
        assert_eq!(c.source, Source::Override);
        let stats = s.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.override_hits, 1);
        assert_eq!(stats.success_rate, 1.0);
    }

    #[test]
    fn invalid_input_is_an_explicit_error() {
        let s = service();
        assert!(matches!(
            s.classify("   "),
            Err(ClassifyError::InvalidInput(_))
        ));
        let stats = s.stats();
        assert_eq!(stats.failed_requests, 1);
        assert!(stats.success_rate < 1.0);
    }

    #[test]
    fn repeat_classification_hits_the_cache() {
        let s = service();
        // No override keywords here; goes through the model + cache.
        let text = "quelles sont vos offres actuelles";
        let first = s.classify(text).unwrap();
        let second = s.classify(text).unwrap();
        assert_eq!(first.source, Source::Model);
        assert_eq!(second.source, Source::Cache);
        assert_eq!(first.category, second.category);
        assert_eq!(s.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn reply_without_backend_is_degraded() {
        let s = service();
        let r = s
            .classify_and_reply("Bug page paiement", None)
            .await
            .unwrap();
        assert!(r.degraded);
        assert_eq!(r.attempts, 0);
        assert_eq!(r.classification.category, Category::Technical);
        assert_eq!(s.stats().degraded_replies, 1);
    }

    #[tokio::test]
    async fn declared_language_wins_over_detection() {
        let s = service();
        let r = s
            .classify_and_reply("Bug page paiement", Some(Lang::En))
            .await
            .unwrap();
        assert_eq!(r.language, Lang::En);
        assert!(r.text.contains("technical team"));
    }

    #[test]
    fn empty_stats_are_well_defined() {
        let s = service();
        let stats = s.stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.success_rate, 1.0);
        assert_eq!(stats.avg_latency, Duration::ZERO);
    }
}
