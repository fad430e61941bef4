//! Credential retrieval for the generative backend.
//!
//! The access credential is resolved once at startup from the
//! environment into a [`SecretString`] and handed to whichever
//! [`crate::provider::GenerativeService`] implementation the embedder
//! wires in. It is never logged or persisted by this crate.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Environment variable holding the generative service credential.
pub const API_KEY_VAR: &str = "SUPPORT_TRIAGE_API_KEY";

/// Resolve the generative-service credential, failing if absent.
pub fn generative_api_key() -> Result<SecretString, ConfigError> {
    try_generative_api_key().ok_or_else(|| ConfigError::MissingEnvVar(API_KEY_VAR.to_string()))
}

/// Resolve the credential if configured. Empty values count as absent.
pub fn try_generative_api_key() -> Option<SecretString> {
    std::env::var(API_KEY_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}
