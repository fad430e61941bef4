//! Input text normalization.
//!
//! Produces the canonical form used as the cache key and the
//! override-matching subject: case-folded, control characters stripped,
//! whitespace collapsed to single spaces.

use crate::error::ClassifyError;

/// Upper bound on raw message length, in characters. Customer-support
/// messages are short; anything past this is rejected rather than fed
/// to the model.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Normalize raw input text.
///
/// Pure function. Fails with [`ClassifyError::InvalidInput`] on empty,
/// whitespace-only, or over-long input; never fails otherwise.
pub fn normalize(raw: &str) -> Result<String, ClassifyError> {
    if raw.trim().is_empty() {
        return Err(ClassifyError::InvalidInput(
            "message is empty or whitespace only".into(),
        ));
    }
    if raw.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ClassifyError::InvalidInput(format!(
            "message too long (max {MAX_MESSAGE_CHARS} characters)"
        )));
    }

    let folded = raw.to_lowercase();
    let stripped: String = folded
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    Ok(stripped.split_whitespace().collect::<Vec<_>>().join(" "))
}
