//! Output validation and sanitization for generated replies.
//!
//! A reply that fails validation (length bounds) is discarded in favor
//! of the fallback text. Accepted replies still go through redaction of
//! recognizable sensitive-data patterns before reaching the caller.

use regex::Regex;
use tracing::warn;

const MIN_REPLY_CHARS: usize = 10;
const MAX_REPLY_CHARS: usize = 2000;

/// Validates and scrubs generated reply text.
pub struct OutputSanitizer {
    forbidden: Vec<Regex>,
    whitespace: Regex,
}

impl OutputSanitizer {
    pub fn new() -> Self {
        let forbidden = vec![
            // Credential disclosures.
            Regex::new(r"(?i)(password|mot de passe|login|connexion)\s*[:=]\s*\S+").unwrap(),
            // Payment card numbers (13-19 digits, optionally separated).
            Regex::new(r"\b(?:\d[ \-]?){13,19}\b").unwrap(),
            // Card vocabulary followed by digits.
            Regex::new(r"(?i)(credit card|carte de crédit|numéro de carte)\s*[:=]?\s*\d+").unwrap(),
        ];
        Self {
            forbidden,
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Length validation. Out-of-bounds replies are rejected and the
    /// caller falls back to the canned response.
    pub fn accepts(&self, reply: &str) -> bool {
        let len = reply.trim().chars().count();
        if len < MIN_REPLY_CHARS || len > MAX_REPLY_CHARS {
            warn!(len, "Generated reply failed length validation");
            return false;
        }
        true
    }

    /// Collapse whitespace and redact sensitive patterns.
    pub fn sanitize(&self, reply: &str) -> String {
        let mut out = self
            .whitespace
            .replace_all(reply.trim(), " ")
            .into_owned();
        for pattern in &self.forbidden {
            if pattern.is_match(&out) {
                warn!("Redacting sensitive pattern from generated reply");
                out = pattern.replace_all(&out, "[REDACTED]").into_owned();
            }
        }
        out
    }
}

impl Default for OutputSanitizer {
    fn default() -> Self {
        Self::new()
    }
}
