//! Language detection for reply generation.
//!
//! Pattern-based scoring over French, English and Arabic. Darija
//! written in Latin script is treated as Arabic for reply templating.
//! French is the default when nothing matches.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Language tag for reply templating.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Fr,
    En,
    Ar,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Fr => "fr",
            Lang::En => "en",
            Lang::Ar => "ar",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fr" => Ok(Lang::Fr),
            "en" => Ok(Lang::En),
            "ar" => Ok(Lang::Ar),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Regex-based language detector.
pub struct LanguageDetector {
    arabic_script: Regex,
    darija: Regex,
    french: Regex,
    english: Regex,
}

impl LanguageDetector {
    pub fn new() -> Self {
        Self {
            arabic_script: Regex::new(r"[\x{0600}-\x{06FF}\x{0750}-\x{077F}]").unwrap(),
            darija: Regex::new(
                r"(?i)\b(wach|wash|kayn|chi|dial|baghi|bghit|n3ref|chno|ndir|ila|kifach|nweqqef|n7bes|lkhedma|meakom|tayh|tay7|chhal|achmen|andy|chokran|khdma|nqiya|zwina|salam|kay5dmch)\b",
            )
            .unwrap(),
            french: Regex::new(
                r"(?i)\b(le|la|les|un|une|des|et|ou|de|du|dans|pour|avec|sur|sans|chez|vers|depuis|merci|bonjour|bonsoir|salut|comment|pourquoi|quand|où|qui|que|quoi|quel|quelle|combien|très|trop|plus|moins|aussi|jamais|toujours|donc|alors|cependant|je|vous|nous|mon|ma|mes|votre|vos)\b",
            )
            .unwrap(),
            english: Regex::new(
                r"(?i)\b(the|a|an|and|or|of|in|on|at|to|for|with|by|from|about|through|before|after|when|where|why|how|all|any|some|no|not|only|so|than|too|very|can|will|just|should|now|i|you|we|my|your|our|is|are|was|were|have|has|need|want|please|thanks|hello)\b",
            )
            .unwrap(),
        }
    }

    /// Detect the language of a raw message.
    pub fn detect(&self, text: &str) -> Lang {
        if text.trim().is_empty() {
            return Lang::Fr;
        }
        if self.arabic_script.is_match(text) || self.darija.is_match(text) {
            return Lang::Ar;
        }

        let french = self.french.find_iter(text).count();
        let english = self.english.find_iter(text).count();
        if english > french { Lang::En } else { Lang::Fr }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_french() {
        let d = LanguageDetector::new();
        assert_eq!(
            d.detect("Bonjour, je veux annuler mon abonnement"),
            Lang::Fr
        );
    }

    #[test]
    fn detects_english() {
        let d = LanguageDetector::new();
        assert_eq!(
            d.detect("Hello, I need help with my account please"),
            Lang::En
        );
    }

    #[test]
    fn detects_arabic_script() {
        let d = LanguageDetector::new();
        assert_eq!(d.detect("شكراً لرسالتكم"), Lang::Ar);
    }

    #[test]
    fn romanized_darija_maps_to_arabic() {
        let d = LanguageDetector::new();
        assert_eq!(d.detect("salam, service dial internet tayh"), Lang::Ar);
        assert_eq!(d.detect("chokran bzaf khdma nqiya"), Lang::Ar);
    }

    #[test]
    fn defaults_to_french() {
        let d = LanguageDetector::new();
        assert_eq!(d.detect("xyzzy 12345"), Lang::Fr);
        assert_eq!(d.detect("   "), Lang::Fr);
    }

    #[test]
    fn lang_parses_from_str() {
        assert_eq!("fr".parse::<Lang>().unwrap(), Lang::Fr);
        assert_eq!("AR".parse::<Lang>().unwrap(), Lang::Ar);
        assert!("de".parse::<Lang>().is_err());
    }
}
