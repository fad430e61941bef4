//! Shared types for the classification pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Service category for a customer message.
///
/// The variant order matches the score-vector order returned by a
/// [`crate::provider::ScoreModel`] (one score per category). Tie-break
/// priority between categories is a separate, configurable policy — see
/// [`crate::config::TriageConfig::priority`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Informations, feedback et demandes.
    Informational,
    /// Support technique.
    Technical,
    /// Transactions financières.
    Financial,
}

impl Category {
    /// All categories, in score-vector order.
    pub const ALL: [Category; 3] = [
        Category::Informational,
        Category::Technical,
        Category::Financial,
    ];

    /// Number of categories. Every probability distribution has exactly
    /// this many entries.
    pub const COUNT: usize = 3;

    /// Stable display label, matching the agent-facing category names.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Informational => "Informations, feedback et demandes",
            Category::Technical => "Support technique",
            Category::Financial => "Transactions financières",
        }
    }

    /// Short machine-readable key (config files, logs).
    pub fn key(&self) -> &'static str {
        match self {
            Category::Informational => "informational",
            Category::Technical => "technical",
            Category::Financial => "financial",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// How a classification result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Deterministic keyword/phrase override, model skipped.
    Override,
    /// Model inference.
    Model,
    /// Served from the prediction cache.
    Cache,
}

/// Result of classifying one message. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// The decided category.
    pub category: Category,
    /// Top probability, the primary user-facing certainty metric.
    pub confidence: f64,
    /// One entry per category, summing to 1 within floating tolerance.
    pub probabilities: BTreeMap<Category, f64>,
    /// Distributional uncertainty, in `[0, ln 3]`.
    pub entropy: f64,
    /// Gap between the top two probabilities.
    pub margin: f64,
    /// Where the result came from.
    pub source: Source,
    /// Wall time spent producing the result.
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(Category::Technical.label(), "Support technique");
        assert_eq!(Category::Financial.label(), "Transactions financières");
        assert_eq!(
            Category::Informational.label(),
            "Informations, feedback et demandes"
        );
    }

    #[test]
    fn category_serializes_as_snake_case_key() {
        let json = serde_json::to_string(&Category::Technical).unwrap();
        assert_eq!(json, "\"technical\"");
        let back: Category = serde_json::from_str("\"financial\"").unwrap();
        assert_eq!(back, Category::Financial);
    }

    #[test]
    fn all_matches_count() {
        assert_eq!(Category::ALL.len(), Category::COUNT);
    }
}
