//! Tourist spot content and its translations.
//!
//! A `ContentItem` is one translatable record authored in the canonical
//! language. Its translations are kept as an explicit map from `Language` to
//! a fixed `TranslationResult` record rather than per-language columns.

use crate::i18n::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_CATEGORY_CHARS: usize = 100;
pub const MAX_TIP_CHARS: usize = 500;
pub const MAX_TIPS: usize = 10;

/// Input rejected before any provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} is {actual} characters, limit is {max}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("{actual} tips supplied, limit is {max}")]
    TooManyTips { max: usize, actual: usize },
}

/// Identity of a content item.
///
/// Only `Persistent` items live in the language store, so only they ever get
/// translations written back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    /// Database-assigned identifier.
    Persistent(Uuid),
    /// Identifier for content defined outside the database (e.g. "3").
    Local(String),
}

impl ItemId {
    /// Classify a raw identifier. Anything that is not a well-formed UUID is
    /// treated as local, hyphens or not.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => ItemId::Persistent(id),
            Err(_) => ItemId::Local(raw.to_string()),
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            ItemId::Persistent(id) => Some(*id),
            ItemId::Local(_) => None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, ItemId::Persistent(_))
    }

    /// The same identifier, detached from the language store.
    pub fn to_local(&self) -> ItemId {
        match self {
            ItemId::Persistent(id) => ItemId::Local(id.to_string()),
            ItemId::Local(id) => ItemId::Local(id.clone()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Persistent(id) => write!(f, "{}", id),
            ItemId::Local(id) => write!(f, "local:{}", id),
        }
    }
}

/// Translated (or source) text for one item in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
}

impl TranslationResult {
    /// All three required fields are present. Tips never affect completeness.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.category.trim().is_empty()
    }
}

/// Source content supplied inline by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InlineItem {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tips: Option<Vec<String>>,
}

/// A translatable tourist spot.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tips: Vec<String>,
    /// Translations already loaded alongside the item.
    pub translations: HashMap<Language, TranslationResult>,
}

impl ContentItem {
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            category: category.into(),
            tips: Vec::new(),
            translations: HashMap::new(),
        }
    }

    pub fn with_tips(mut self, tips: Vec<String>) -> Self {
        self.tips = tips;
        self
    }

    pub fn with_translation(mut self, language: Language, translation: TranslationResult) -> Self {
        self.translations.insert(language, translation);
        self
    }

    pub fn from_inline(id: ItemId, inline: InlineItem) -> Self {
        Self::new(id, inline.name, inline.description, inline.category)
            .with_tips(inline.tips.unwrap_or_default())
    }

    /// The item's own fields, as returned for the canonical language and on
    /// every fallback path.
    pub fn source(&self) -> TranslationResult {
        TranslationResult {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            tips: self.tips.clone(),
        }
    }

    /// A complete translation already held in memory for `language`.
    pub fn loaded_translation(&self, language: Language) -> Option<&TranslationResult> {
        self.translations
            .get(&language)
            .filter(|translation| translation.is_complete())
    }

    /// Enforce the bounds applied before content is sent to a provider.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("category", &self.category)?;

        check_length("description", &self.description, MAX_DESCRIPTION_CHARS)?;
        check_length("category", &self.category, MAX_CATEGORY_CHARS)?;

        if self.tips.len() > MAX_TIPS {
            return Err(ValidationError::TooManyTips {
                max: MAX_TIPS,
                actual: self.tips.len(),
            });
        }
        for (index, tip) in self.tips.iter().enumerate() {
            check_length(&format!("tips[{}]", index), tip, MAX_TIP_CHARS)?;
        }

        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }
    Ok(())
}
