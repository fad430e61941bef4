//! Error types for support-triage.

use std::time::Duration;

/// Top-level error type for the service.
///
/// Reply-generation failures are deliberately absent: the reply path
/// always resolves to a degraded [`crate::reply::ReplyResult`] instead
/// of surfacing an error to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification-path errors. All of these are fatal for the request:
/// local model failures are not expected to be transient, so nothing
/// here is retried.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Classification model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Model returned {got} scores, expected {expected}")]
    MalformedScores { expected: usize, got: usize },

    #[error("Invalid probability distribution: {reason}")]
    InvalidDistribution { reason: String },
}

/// Failure modes of the external generative service.
///
/// These never propagate out of the reply orchestrator: `Blocked` stops
/// retrying immediately, the other two are retried under backoff, and
/// every exhausted path degrades to a fallback reply.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerateError {
    #[error("Output blocked by safety policy: {reason}")]
    Blocked { reason: String },

    #[error("Service rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transient service failure: {reason}")]
    Transient { reason: String },
}

impl GenerateError {
    /// Whether the retry loop may attempt the call again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Blocked { .. })
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blocked { .. } => "blocked",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient { .. } => "transient",
        }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
