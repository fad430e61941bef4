//! support-triage — customer-message classification and reply
//! generation with deterministic overrides, uncertainty metrics, a
//! memoizing cache, and a retry/fallback reply orchestrator.

pub mod classify;
pub mod config;
pub mod credentials;
pub mod error;
pub mod provider;
pub mod reply;
pub mod service;

pub use classify::{Category, Classification, Source};
pub use config::TriageConfig;
pub use error::{ClassifyError, ConfigError, Error, GenerateError};
pub use provider::{GenerationParams, GenerativeService, LexiconModel, ScoreModel};
pub use reply::{Lang, ReplyResult};
pub use service::{StatsSnapshot, TriageService};
