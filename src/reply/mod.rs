//! Reply generation: language detection, prompt construction, output
//! sanitization, and the retry/fallback orchestrator.

pub mod language;
pub mod orchestrator;
pub mod prompt;
pub mod sanitize;

pub use language::{Lang, LanguageDetector};
pub use orchestrator::{ReplyOrchestrator, ReplyResult};
pub use prompt::ReplyPromptBuilder;
pub use sanitize::OutputSanitizer;
