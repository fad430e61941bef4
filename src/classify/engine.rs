//! Model-backed prediction.
//!
//! Builds the categorical prompt, obtains one raw score per category
//! from the model adapter, converts scores to a probability
//! distribution, and selects the decision. Classification is a single
//! deterministic forward pass — no sampling, no retries; transient
//! failure handling belongs to the reply path only.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::classify::types::{Category, Classification, Source};
use crate::classify::uncertainty;
use crate::config::PromptConfig;
use crate::error::ClassifyError;
use crate::provider::ScoreModel;

/// Classifies normalized text via a [`ScoreModel`].
pub struct PredictionEngine {
    model: Arc<dyn ScoreModel>,
    system_prompt: String,
    template: String,
    priority: Vec<Category>,
}

impl PredictionEngine {
    pub fn new(model: Arc<dyn ScoreModel>, prompts: &PromptConfig, priority: &[Category]) -> Self {
        Self {
            model,
            system_prompt: prompts.classifier_system.clone(),
            template: prompts.classifier_template.clone(),
            priority: priority.to_vec(),
        }
    }

    /// Classify one normalized message.
    pub fn classify(&self, normalized: &str) -> Result<Classification, ClassifyError> {
        let start = Instant::now();
        let prompt = self.build_prompt(normalized);

        let scores = self.model.score(&prompt)?;
        if scores.len() != Category::COUNT {
            return Err(ClassifyError::MalformedScores {
                expected: Category::COUNT,
                got: scores.len(),
            });
        }

        let probabilities = softmax(&scores);
        let metrics = uncertainty::compute(&probabilities)?;
        let category = self.select(&probabilities);

        debug!(
            %category,
            confidence = metrics.confidence,
            entropy = metrics.entropy,
            "Model classification complete"
        );

        Ok(Classification {
            category,
            confidence: metrics.confidence,
            probabilities,
            entropy: metrics.entropy,
            margin: metrics.margin,
            source: Source::Model,
            processing_time: start.elapsed(),
        })
    }

    /// Embed the message in the fixed instruction template.
    fn build_prompt(&self, message: &str) -> String {
        self.template
            .replace("{system}", &self.system_prompt)
            .replace("{message}", message)
    }

    /// Argmax over the distribution; exact ties resolve to the category
    /// appearing first in the priority order, matching the override
    /// policy.
    fn select(&self, probabilities: &BTreeMap<Category, f64>) -> Category {
        let mut best = self.priority[0];
        let mut best_p = f64::NEG_INFINITY;
        for &category in &self.priority {
            let p = probabilities[&category];
            if p > best_p {
                best = category;
                best_p = p;
            }
        }
        best
    }
}

/// Numerically stable softmax: subtract the maximum score before
/// exponentiation. Scores arrive in [`Category::ALL`] order.
fn softmax(scores: &[f64]) -> BTreeMap<Category, f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    Category::ALL
        .iter()
        .zip(&exps)
        .map(|(&category, &e)| (category, e / sum))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriageConfig;
    use crate::provider::ScoreModel;

    struct FixedScores(Vec<f64>);

    impl ScoreModel for FixedScores {
        fn score(&self, _prompt: &str) -> Result<Vec<f64>, ClassifyError> {
            Ok(self.0.clone())
        }
    }

    struct CapturePrompt(std::sync::Mutex<String>);

    impl ScoreModel for CapturePrompt {
        fn score(&self, prompt: &str) -> Result<Vec<f64>, ClassifyError> {
            *self.0.lock().unwrap() = prompt.to_string();
            Ok(vec![0.0, 0.0, 0.0])
        }
    }

    fn engine(model: Arc<dyn ScoreModel>) -> PredictionEngine {
        let config = TriageConfig::default();
        PredictionEngine::new(model, &config.prompts, &config.priority)
    }

    #[test]
    fn softmax_is_normalized_and_ordered() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(probs[&Category::Financial] > probs[&Category::Technical]);
        assert!(probs[&Category::Technical] > probs[&Category::Informational]);
    }

    #[test]
    fn softmax_handles_large_scores() {
        // Without max subtraction these would overflow to inf.
        let probs = softmax(&[1000.0, 1001.0, 999.0]);
        let sum: f64 = probs.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs.values().all(|p| p.is_finite()));
    }

    #[test]
    fn log_probability_scores_round_trip() {
        // Scores of ln(p) softmax back to exactly p.
        let e = engine(Arc::new(FixedScores(vec![
            0.1f64.ln(),
            0.1f64.ln(),
            0.8f64.ln(),
        ])));
        let c = e.classify("message sans mots connus").unwrap();
        assert_eq!(c.category, Category::Financial);
        assert!((c.confidence - 0.8).abs() < 1e-9);
        assert!((c.probabilities[&Category::Informational] - 0.1).abs() < 1e-9);
        assert!((c.margin - 0.7).abs() < 1e-9);
        assert_eq!(c.source, Source::Model);
    }

    #[test]
    fn exact_tie_resolves_by_priority() {
        let e = engine(Arc::new(FixedScores(vec![0.0, 0.0, 0.0])));
        let c = e.classify("anything").unwrap();
        // Uniform distribution: first category in priority order wins.
        assert_eq!(c.category, Category::Technical);
        assert!(c.margin.abs() < 1e-12);
    }

    #[test]
    fn wrong_arity_is_malformed() {
        let e = engine(Arc::new(FixedScores(vec![0.5, 0.5])));
        let err = e.classify("text").unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::MalformedScores { expected: 3, got: 2 }
        ));
    }

    #[test]
    fn model_unavailable_propagates() {
        struct Down;
        impl ScoreModel for Down {
            fn score(&self, _prompt: &str) -> Result<Vec<f64>, ClassifyError> {
                Err(ClassifyError::ModelUnavailable {
                    reason: "weights missing".into(),
                })
            }
        }
        let e = engine(Arc::new(Down));
        assert!(matches!(
            e.classify("text").unwrap_err(),
            ClassifyError::ModelUnavailable { .. }
        ));
    }

    #[test]
    fn prompt_embeds_system_and_message() {
        let capture = Arc::new(CapturePrompt(std::sync::Mutex::new(String::new())));
        let e = engine(capture.clone());
        e.classify("wach kayn chi solution").unwrap();
        let prompt = capture.0.lock().unwrap().clone();
        assert!(prompt.contains("wach kayn chi solution"));
        assert!(prompt.contains("Support technique"));
    }
}
