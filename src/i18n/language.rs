//! Language type: validated language representation.
//!
//! A `Language` can only be built from a code the registry knows and has
//! enabled. Regional variants (`pt-BR`, `en_US`) and casing differences are
//! folded into the base code, so "pt-BR" and "PT" both resolve to Portuguese.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use anyhow::{bail, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// A validated language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    /// ISO 639-1 language code (e.g., "pt", "en")
    code: &'static str,
}

impl Language {
    pub const PORTUGUESE: Language = Language { code: "pt" };
    pub const ENGLISH: Language = Language { code: "en" };
    pub const SPANISH: Language = Language { code: "es" };

    /// Create a Language from a language tag.
    ///
    /// Accepts bare codes ("en") as well as regional tags ("en-US", "pt_BR").
    /// Only the primary subtag is significant.
    ///
    /// # Returns
    /// * `Ok(Language)` if the code is known and enabled
    /// * `Err` if the code is empty, unknown, or disabled
    pub fn from_code(code: &str) -> Result<Language> {
        let base = base_code(code);
        if base.is_empty() {
            bail!("Language code is empty");
        }

        let registry = LanguageRegistry::get();

        match registry.get_by_code(&base) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            Some(_) => bail!("Language '{}' is not enabled", code),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    /// The language content is authored in.
    pub fn canonical() -> Language {
        let config = LanguageRegistry::get().canonical();
        Language { code: config.code }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is missing from the registry, which cannot happen for
    /// values built through `from_code` or the constants.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

/// Lowercased primary subtag of a language tag ("pt-BR" -> "pt").
fn base_code(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portuguese_constant() {
        let portuguese = Language::PORTUGUESE;
        assert_eq!(portuguese.code(), "pt");
        assert_eq!(portuguese.name(), "Portuguese");
        assert!(portuguese.is_canonical());
    }

    #[test]
    fn test_english_constant() {
        let english = Language::ENGLISH;
        assert_eq!(english.code(), "en");
        assert!(!english.is_canonical());
    }

    #[test]
    fn test_from_code_plain() {
        assert_eq!(Language::from_code("es").unwrap(), Language::SPANISH);
        assert_eq!(Language::from_code("fr").unwrap().name(), "French");
    }

    #[test]
    fn test_from_code_regional_variants() {
        assert_eq!(Language::from_code("pt-BR").unwrap(), Language::PORTUGUESE);
        assert_eq!(Language::from_code("pt_PT").unwrap(), Language::PORTUGUESE);
        assert_eq!(Language::from_code("en-US").unwrap(), Language::ENGLISH);
    }

    #[test]
    fn test_from_code_is_case_insensitive() {
        assert_eq!(Language::from_code("PT").unwrap(), Language::PORTUGUESE);
        assert_eq!(Language::from_code(" En-gb ").unwrap(), Language::ENGLISH);
    }

    #[test]
    fn test_from_code_unknown() {
        let result = Language::from_code("ja");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown"));
    }

    #[test]
    fn test_from_code_disabled() {
        let result = Language::from_code("zh-CN");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not enabled"));
    }

    #[test]
    fn test_from_code_empty() {
        assert!(Language::from_code("").is_err());
        assert!(Language::from_code("-BR").is_err());
    }

    #[test]
    fn test_canonical_is_portuguese() {
        assert_eq!(Language::canonical(), Language::PORTUGUESE);
    }

    #[test]
    fn test_display_and_serialize_use_code() {
        assert_eq!(Language::SPANISH.to_string(), "es");
        assert_eq!(serde_json::to_string(&Language::ENGLISH).unwrap(), "\"en\"");
    }

    #[test]
    fn test_native_name() {
        assert_eq!(Language::PORTUGUESE.native_name(), "Português");
        assert_eq!(Language::SPANISH.native_name(), "Español");
    }
}
