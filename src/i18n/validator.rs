//! Translation quality validation module.
//!
//! Checks provider output against the source content. Errors mean the output
//! is unusable (blank required fields); warnings flag things a reviewer may
//! want to look at, such as URLs or opening hours that did not survive.

use crate::content::TranslationResult;
use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Problems that make the translation unusable
    pub errors: Vec<String>,

    /// Non-critical issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for translation quality.
pub struct TranslationValidator;

static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate a provider translation against its source.
    pub fn validate(source: &TranslationResult, translated: &TranslationResult) -> ValidationReport {
        let mut report = ValidationReport::new();

        for (field, value) in [
            ("name", &translated.name),
            ("description", &translated.description),
            ("category", &translated.category),
        ] {
            if value.trim().is_empty() {
                report.errors.push(format!("Translated {} is empty", field));
            }
        }

        if source.tips.len() != translated.tips.len() {
            report.warnings.push(format!(
                "Tip count mismatch: source has {}, translation has {}",
                source.tips.len(),
                translated.tips.len()
            ));
        }

        let orig_urls = Self::extract_urls(&source.description);
        let trans_urls = Self::extract_urls(&translated.description);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: source has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        // Opening hours, prices and phone numbers should carry over unchanged
        let orig_numbers = Self::extract_numbers(&source.description);
        let trans_numbers = Self::extract_numbers(&translated.description);
        if orig_numbers != trans_numbers {
            report.warnings.push(format!(
                "Number mismatch: source has {:?}, translation has {:?}",
                orig_numbers, trans_numbers
            ));
        }

        if source.description.trim().len() > 40
            && source.description.trim() == translated.description.trim()
        {
            report
                .warnings
                .push("Description is identical to the source".to_string());
        }

        report
    }

    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s)\]]+").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn extract_numbers(text: &str) -> Vec<String> {
        let regex = NUMBER_REGEX.get_or_init(|| Regex::new(r"\d+").unwrap());

        let mut numbers: Vec<String> = regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        // Word order changes between languages; only the multiset matters
        numbers.sort();
        numbers
    }
}
