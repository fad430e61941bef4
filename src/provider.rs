//! External collaborator boundaries.
//!
//! The classification model and the generative reply service are
//! consumed through capability traits so the pipeline can be exercised
//! against test doubles without a hosted model or a network call. A
//! small keyword-lexicon scorer ships as the default local model.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classify::types::Category;
use crate::error::{ClassifyError, GenerateError};

/// Local classification model: one deterministic forward pass
/// producing a raw score per category, in [`Category::ALL`] order.
pub trait ScoreModel: Send + Sync {
    fn score(&self, prompt: &str) -> Result<Vec<f64>, ClassifyError>;
}

/// Generation parameters and safety policy forwarded to the
/// generative service on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    /// Harm category → blocking threshold, passed through opaquely.
    pub safety_settings: BTreeMap<String, String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        let block = |category: &str| {
            (category.to_string(), "BLOCK_MEDIUM_AND_ABOVE".to_string())
        };
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
            safety_settings: BTreeMap::from([
                block("harassment"),
                block("hate_speech"),
                block("sexually_explicit"),
                block("dangerous_content"),
            ]),
        }
    }
}

/// External generative reply service. Transport is the implementor's
/// concern; the orchestrator only sees the three failure modes of
/// [`GenerateError`].
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerateError>;
}

/// Keyword-weighted local scorer: the score for a category is the
/// number of lexicon tokens for that category present in the prompt.
/// With no hits anywhere the distribution comes out uniform.
pub struct LexiconModel {
    lexicon: BTreeMap<Category, Vec<String>>,
}

impl LexiconModel {
    pub fn new(lexicon: BTreeMap<Category, Vec<String>>) -> Self {
        Self { lexicon }
    }
}

impl ScoreModel for LexiconModel {
    fn score(&self, prompt: &str) -> Result<Vec<f64>, ClassifyError> {
        let folded = prompt.to_lowercase();
        let tokens: Vec<&str> = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let scores = Category::ALL
            .iter()
            .map(|category| {
                self.lexicon
                    .get(category)
                    .map(|words| {
                        words
                            .iter()
                            .filter(|w| tokens.contains(&w.as_str()))
                            .count() as f64
                    })
                    .unwrap_or(0.0)
            })
            .collect();
        Ok(scores)
    }
}
