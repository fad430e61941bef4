//! Reply prompt construction and final formatting.

use crate::classify::types::Classification;
use crate::config::PromptConfig;
use crate::reply::language::Lang;

/// Builds generation prompts from the configured templates.
pub struct ReplyPromptBuilder {
    prompts: PromptConfig,
}

impl ReplyPromptBuilder {
    pub fn new(prompts: PromptConfig) -> Self {
        Self { prompts }
    }

    /// Assemble the full generation prompt: system instruction,
    /// category-specific instruction, then the templated message block.
    pub fn build(&self, message: &str, classification: &Classification, lang: Lang) -> String {
        let category_prompt = self
            .prompts
            .category_prompts
            .get(&classification.category)
            .map(String::as_str)
            .unwrap_or_default();

        let body = self
            .prompts
            .reply_template
            .replace("{category}", classification.category.label())
            .replace(
                "{confidence}",
                &format!("{:.1}%", classification.confidence * 100.0),
            )
            .replace("{language}", lang.code())
            .replace("{message}", message);

        format!("{}\n\n{}\n\n{}", self.prompts.reply_system, category_prompt, body)
    }

    /// Wrap a generated reply in the language-specific template.
    pub fn finalize(&self, generated: &str, lang: Lang) -> String {
        let template = self
            .prompts
            .language_templates
            .get(&lang)
            .or_else(|| self.prompts.language_templates.get(&Lang::Fr))
            .map(String::as_str)
            .unwrap_or("{response}");
        template.replace("{response}", generated.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use crate::classify::types::{Category, Source};
    use crate::config::TriageConfig;

    fn classification(category: Category) -> Classification {
        Classification {
            category,
            confidence: 0.85,
            probabilities: Category::ALL
                .iter()
                .map(|&c| (c, if c == category { 0.85 } else { 0.075 }))
                .collect::<BTreeMap<_, _>>(),
            entropy: 0.5,
            margin: 0.775,
            source: Source::Model,
            processing_time: Duration::from_millis(3),
        }
    }

    #[test]
    fn prompt_contains_all_parts() {
        let builder = ReplyPromptBuilder::new(TriageConfig::default().prompts);
        let prompt = builder.build(
            "ma connexion ne marche pas",
            &classification(Category::Technical),
            Lang::Fr,
        );
        assert!(prompt.contains("Support technique"));
        assert!(prompt.contains("85.0%"));
        assert!(prompt.contains("ma connexion ne marche pas"));
        assert!(prompt.contains("équipe technique"));
        assert!(prompt.contains("fr"));
    }

    #[test]
    fn finalize_trims_and_templates() {
        let builder = ReplyPromptBuilder::new(TriageConfig::default().prompts);
        let out = builder.finalize("  Merci pour votre message.  ", Lang::Fr);
        assert_eq!(out, "Merci pour votre message.");
    }

    #[test]
    fn finalize_falls_back_to_french_template() {
        let mut prompts = TriageConfig::default().prompts;
        prompts.language_templates.remove(&Lang::En);
        prompts
            .language_templates
            .insert(Lang::Fr, "[fr] {response}".into());
        let builder = ReplyPromptBuilder::new(prompts);
        assert_eq!(builder.finalize("hello", Lang::En), "[fr] hello");
    }
}
