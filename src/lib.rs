//! On-demand translation of Rio de Janeiro tourist spots.
//!
//! Content authored in Portuguese is translated through an LLM provider the
//! first time a language is requested, then served from the language store.
//! Narration audio is cached the same way in object storage.

pub mod config;
pub mod content;
pub mod fingerprint;
pub mod i18n;
pub mod provider;
pub mod resolver;
pub mod security;
pub mod server;
pub mod speech;
pub mod store;
