//! Configuration types and YAML loading.
//!
//! Everything the pipeline needs is resolved once at startup into a
//! [`TriageConfig`] and passed by reference into component
//! constructors — no ambient lookup. Defaults reproduce the shipped
//! French/Darija support tables, so the service runs with no config
//! file at all.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::types::Category;
use crate::error::ConfigError;
use crate::provider::GenerationParams;
use crate::reply::language::Lang;

/// An exact-phrase override rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseRule {
    pub phrase: String,
    pub category: Category,
}

/// Deterministic override table: exact phrases consulted before
/// per-category keyword lists. Read-only after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideTable {
    pub phrases: Vec<PhraseRule>,
    pub keywords: BTreeMap<Category, Vec<String>>,
}

impl Default for OverrideTable {
    fn default() -> Self {
        let phrase = |phrase: &str, category| PhraseRule {
            phrase: phrase.to_string(),
            category,
        };
        Self {
            phrases: vec![
                phrase("bug page paiement", Category::Technical),
                phrase("service client offline", Category::Technical),
                phrase("connexion internet tayha", Category::Technical),
                phrase("annuler mon abonnement", Category::Financial),
                phrase("montant dial facture", Category::Financial),
                phrase("horaires d'ouverture", Category::Informational),
            ],
            keywords: BTreeMap::from([
                (
                    Category::Technical,
                    words(&[
                        "bug", "offline", "tayh", "tay7", "réseau", "connexion",
                        "technicien", "panne",
                    ]),
                ),
                (
                    Category::Financial,
                    words(&[
                        "facture", "paiement", "abonnement", "remboursement",
                        "montant", "tarif", "résiliation",
                    ]),
                ),
                (
                    Category::Informational,
                    words(&[
                        "horaires", "planning", "disponibilité", "feedback",
                        "chokran", "merci",
                    ]),
                ),
            ]),
        }
    }
}

/// Retry/backoff policy for the reply path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
    #[serde(with = "duration_secs")]
    pub initial_delay: Duration,
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
    /// Backoff multiplier applied after each failed attempt.
    pub multiplier: f64,
    /// Per-attempt timeout, independent of the backoff delays.
    #[serde(with = "duration_secs")]
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Prediction cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Prompt templates for classification and reply generation.
///
/// Placeholders: `{system}` / `{message}` in the classifier template;
/// `{category}` / `{confidence}` / `{message}` / `{language}` in the
/// reply template; `{response}` in language templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub classifier_system: String,
    pub classifier_template: String,
    pub reply_system: String,
    pub category_prompts: BTreeMap<Category, String>,
    pub reply_template: String,
    pub language_templates: BTreeMap<Lang, String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            classifier_system: "Tu es un classificateur de messages clients. \
                Catégories: 1 = Support technique, 2 = Transactions financières, \
                3 = Informations, feedback et demandes. Réponds uniquement par \
                le numéro de la catégorie."
                .into(),
            classifier_template: "{system}\n\nMessage: {message}\nCatégorie:".into(),
            reply_system: "Tu es un agent du service client. Rédige une réponse \
                courte, polie et utile au message du client. Ne demande jamais \
                d'informations sensibles."
                .into(),
            category_prompts: BTreeMap::from([
                (
                    Category::Technical,
                    "Le client signale un problème technique. Rassure-le et \
                     indique que l'équipe technique prend en charge sa demande."
                        .into(),
                ),
                (
                    Category::Financial,
                    "Le client a une question de facturation ou de paiement. \
                     Confirme la prise en charge par le service facturation."
                        .into(),
                ),
                (
                    Category::Informational,
                    "Le client demande une information ou laisse un retour. \
                     Remercie-le et réponds à sa demande."
                        .into(),
                ),
            ]),
            reply_template: "Catégorie: {category} (confiance {confidence})\n\
                Langue: {language}\nMessage du client: {message}\nRéponse:"
                .into(),
            language_templates: BTreeMap::from([
                (Lang::Fr, "{response}".into()),
                (Lang::En, "{response}".into()),
                (Lang::Ar, "{response}".into()),
            ]),
        }
    }
}

/// Canned fallback replies, per language then category. Used whenever
/// generation is blocked, exhausted, or unavailable.
pub type FallbackTable = BTreeMap<Lang, BTreeMap<Category, String>>;

fn default_fallbacks() -> FallbackTable {
    BTreeMap::from([
        (
            Lang::Fr,
            BTreeMap::from([
                (
                    Category::Technical,
                    "Merci pour votre message. Notre équipe technique va examiner \
                     votre demande et vous contacter rapidement."
                        .to_string(),
                ),
                (
                    Category::Financial,
                    "Merci pour votre demande. Notre service facturation va \
                     traiter votre requête dans les plus brefs délais."
                        .to_string(),
                ),
                (
                    Category::Informational,
                    "Merci pour votre message. Nous avons bien reçu votre demande \
                     et vous répondrons prochainement."
                        .to_string(),
                ),
            ]),
        ),
        (
            Lang::Ar,
            BTreeMap::from([
                (
                    Category::Technical,
                    "شكراً لرسالتكم. فريق الدعم التقني سيفحص طلبكم ويتواصل معكم قريباً."
                        .to_string(),
                ),
                (
                    Category::Financial,
                    "شكراً لطلبكم. خدمة الفوترة ستعالج استفساركم في أقرب وقت ممكن."
                        .to_string(),
                ),
                (
                    Category::Informational,
                    "شكراً لرسالتكم. لقد استلمنا طلبكم وسنرد عليكم قريباً.".to_string(),
                ),
            ]),
        ),
        (
            Lang::En,
            BTreeMap::from([
                (
                    Category::Technical,
                    "Thank you for your message. Our technical team will review \
                     your request and contact you shortly."
                        .to_string(),
                ),
                (
                    Category::Financial,
                    "Thank you for your request. Our billing service will process \
                     your inquiry as soon as possible."
                        .to_string(),
                ),
                (
                    Category::Informational,
                    "Thank you for your message. We have received your request \
                     and will respond to you soon."
                        .to_string(),
                ),
            ]),
        ),
    ])
}

/// Keyword lexicon backing the built-in local scorer.
fn default_lexicon() -> BTreeMap<Category, Vec<String>> {
    BTreeMap::from([
        (
            Category::Technical,
            words(&[
                "bug", "problème", "offline", "tayh", "tay7", "réseau",
                "connexion", "internet", "technicien", "panne", "erreur",
                "marche", "kay5dmch", "service",
            ]),
        ),
        (
            Category::Financial,
            words(&[
                "facture", "paiement", "paiements", "abonnement", "montant",
                "tarif", "remboursement", "résiliation", "annuler", "compte",
                "bghit", "nweqqef",
            ]),
        ),
        (
            Category::Informational,
            words(&[
                "horaires", "planning", "disponibilité", "information",
                "feedback", "merci", "chokran", "bonjour", "salam", "question",
                "quand", "où",
            ]),
        ),
    ])
}

/// Complete service configuration, resolved once per process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Category priority used for override scanning and argmax
    /// tie-breaks. Must be a permutation of the category set.
    pub priority: Vec<Category>,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub generation: GenerationParams,
    pub overrides: OverrideTable,
    pub lexicon: BTreeMap<Category, Vec<String>>,
    pub prompts: PromptConfig,
    pub fallbacks: FallbackTable,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            priority: vec![
                Category::Technical,
                Category::Financial,
                Category::Informational,
            ],
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            generation: GenerationParams::default(),
            overrides: OverrideTable::default(),
            lexicon: default_lexicon(),
            prompts: PromptConfig::default(),
            fallbacks: default_fallbacks(),
        }
    }
}

impl TriageConfig {
    /// Load configuration from a YAML file. Missing keys fall back to
    /// defaults; the result is validated before use.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<Category> = self.priority.clone();
        seen.sort();
        seen.dedup();
        if self.priority.len() != Category::COUNT || seen.len() != Category::COUNT {
            return Err(ConfigError::InvalidValue {
                key: "priority".into(),
                message: "must be a permutation of the three categories".into(),
            });
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.multiplier".into(),
                message: "must be >= 1".into(),
            });
        }
        if self.retry.max_delay < self.retry.initial_delay {
            return Err(ConfigError::InvalidValue {
                key: "retry.max_delay".into(),
                message: "must be >= retry.initial_delay".into(),
            });
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cache.capacity".into(),
                message: "must be >= 1".into(),
            });
        }
        for lang in [Lang::Fr, Lang::En, Lang::Ar] {
            let per_lang = self.fallbacks.get(&lang).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: "fallbacks".into(),
                    message: format!("missing fallback replies for language {lang}"),
                }
            })?;
            for category in Category::ALL {
                if !per_lang.contains_key(&category) {
                    return Err(ConfigError::InvalidValue {
                        key: "fallbacks".into(),
                        message: format!("missing {lang}/{category} fallback reply"),
                    });
                }
            }
        }
        Ok(())
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Durations as fractional seconds in config files.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom(
                "duration must be a non-negative number of seconds",
            ));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        TriageConfig::default().validate().unwrap();
    }

    #[test]
    fn loads_partial_yaml_over_defaults() {
        let yaml = "
retry:
  max_retries: 5
  initial_delay: 0.25
cache:
  capacity: 50
priority: [financial, technical, informational]
";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = TriageConfig::load(file.path()).unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        // Unspecified retry keys keep defaults.
        assert_eq!(config.retry.max_delay, Duration::from_secs(60));
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.priority[0], Category::Financial);
        // Untouched sections keep defaults.
        assert!(!config.overrides.phrases.is_empty());
    }

    #[test]
    fn rejects_bad_priority() {
        let mut config = TriageConfig::default();
        config.priority = vec![Category::Technical, Category::Technical, Category::Financial];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_multiplier_below_one() {
        let mut config = TriageConfig::default();
        config.retry.multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut config = TriageConfig::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_incomplete_fallbacks() {
        let mut config = TriageConfig::default();
        config
            .fallbacks
            .get_mut(&Lang::En)
            .unwrap()
            .remove(&Category::Financial);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_duration() {
        let yaml = "retry:\n  initial_delay: -1.0\n";
        let err = serde_yaml::from_str::<TriageConfig>(yaml);
        assert!(err.is_err());
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = TriageConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: TriageConfig = serde_yaml::from_str(&yaml).unwrap();
        back.validate().unwrap();
        assert_eq!(back.priority, config.priority);
        assert_eq!(back.retry.max_retries, config.retry.max_retries);
    }
}
