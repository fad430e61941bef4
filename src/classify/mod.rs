//! Classification pipeline: normalization, deterministic overrides,
//! model prediction, uncertainty metrics, and the memoizing cache.

pub mod cache;
pub mod engine;
pub mod normalize;
pub mod overrides;
pub mod types;
pub mod uncertainty;

pub use cache::PredictionCache;
pub use engine::PredictionEngine;
pub use normalize::normalize;
pub use overrides::OverrideMatcher;
pub use types::{Category, Classification, Source};
pub use uncertainty::Uncertainty;
