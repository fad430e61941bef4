//! Deterministic override matching, run before the model.
//!
//! Short-circuits classification for known message patterns:
//! exact phrases are checked first (longest contained phrase wins),
//! then per-category keyword lists in the configured priority order.
//! A message carrying cues for several categories therefore resolves
//! to the highest-priority one.
//!
//! When a rule matches, the model call is skipped entirely.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::classify::normalize::normalize;
use crate::classify::types::{Category, Classification, Source};
use crate::config::OverrideTable;

/// Matches normalized text against the override table.
///
/// Deterministic and total: always terminates, never blocks, and the
/// same input always yields the same decision.
pub struct OverrideMatcher {
    /// Normalized phrase → category, consulted first.
    phrases: Vec<(String, Category)>,
    /// Normalized keywords grouped by category, in priority order.
    keywords: Vec<(Category, Vec<String>)>,
}

impl OverrideMatcher {
    /// Build a matcher from the configured table. Phrases and keywords
    /// go through the same normalization as inputs so matching is
    /// case- and whitespace-insensitive.
    pub fn new(table: &OverrideTable, priority: &[Category]) -> Self {
        let phrases = table
            .phrases
            .iter()
            .filter_map(|rule| {
                normalize(&rule.phrase)
                    .ok()
                    .map(|p| (p, rule.category))
            })
            .collect();

        let keywords = priority
            .iter()
            .map(|&category| {
                let words = table
                    .keywords
                    .get(&category)
                    .map(|list| {
                        list.iter()
                            .filter_map(|w| normalize(w).ok())
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                (category, words)
            })
            .collect();

        Self { phrases, keywords }
    }

    /// An empty matcher (for testing).
    pub fn empty() -> Self {
        Self {
            phrases: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Check normalized text against the table.
    ///
    /// Returns `Some(category)` when a rule matches (model is skipped),
    /// `None` to fall through to model classification.
    pub fn matches(&self, normalized: &str) -> Option<Category> {
        // Longest exact phrase contained in the text wins.
        let mut best: Option<(usize, Category)> = None;
        for (phrase, category) in &self.phrases {
            if normalized.contains(phrase.as_str())
                && best.is_none_or(|(len, _)| phrase.len() > len)
            {
                best = Some((phrase.len(), *category));
            }
        }
        if let Some((_, category)) = best {
            debug!(%category, "Exact phrase override matched");
            return Some(category);
        }

        // Keyword lists, grouped by category in priority order.
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        for (category, words) in &self.keywords {
            if words.iter().any(|w| tokens.contains(&w.as_str())) {
                debug!(%category, "Keyword override matched");
                return Some(*category);
            }
        }

        None
    }

    /// Build the classification result for an override decision: full
    /// probability mass on the matched category.
    pub fn classification_for(category: Category, elapsed: Duration) -> Classification {
        let probabilities: BTreeMap<Category, f64> = Category::ALL
            .iter()
            .map(|&c| (c, if c == category { 1.0 } else { 0.0 }))
            .collect();
        Classification {
            category,
            confidence: 1.0,
            probabilities,
            entropy: 0.0,
            margin: 1.0,
            source: Source::Override,
            processing_time: elapsed,
        }
    }
}
