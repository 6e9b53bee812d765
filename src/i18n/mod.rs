//! Internationalization (i18n) module.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for supported languages and their metadata
//! - `language`: Validated `Language` type, tolerant of regional variants
//! - `validator`: Quality checks on provider translations
//! - `metrics`: Cache, provider and persistence counters
//!
//! # Example
//!
//! ```rust,ignore
//! use tourist_translate::i18n::{Language, LanguageRegistry};
//!
//! let canonical = Language::canonical(); // Portuguese
//! let english = Language::from_code("en-US")?;
//! let languages = LanguageRegistry::get().list_enabled();
//! ```

mod language;
mod metrics;
mod registry;
mod validator;

pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use validator::{TranslationValidator, ValidationReport};
