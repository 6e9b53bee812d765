//! Language store: persisted tourist spots and their per-language translations.
//!
//! `LanguageStore` is the raw backend (Postgres in production, in-memory for
//! tests and the preview binary). `TranslationStore` wraps a backend with the
//! accessor semantics the resolver relies on: local items never touch the
//! backend, and read/write failures are logged rather than propagated.

use crate::content::{ContentItem, ItemId, TranslationResult};
use crate::i18n::Language;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[async_trait]
pub trait LanguageStore: Send + Sync {
    /// Load an item together with every translation stored for it.
    async fn fetch_item(&self, id: Uuid) -> Result<Option<ContentItem>>;

    /// Load the stored translation for one language, complete or not.
    async fn read_translation(
        &self,
        id: Uuid,
        language: Language,
    ) -> Result<Option<TranslationResult>>;

    /// Insert or replace the translation for one language. Last write wins.
    async fn upsert_translation(
        &self,
        id: Uuid,
        language: Language,
        translation: &TranslationResult,
    ) -> Result<()>;
}

// ==================== Postgres ====================

#[derive(Clone)]
pub struct PgLanguageStore {
    pool: PgPool,
}

impl PgLanguageStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Create tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tourist_spots (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                tips TEXT[] NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create tourist_spots table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tourist_spot_translations (
                spot_id UUID NOT NULL REFERENCES tourist_spots(id) ON DELETE CASCADE,
                language TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                tips TEXT[] NOT NULL DEFAULT '{}',
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (spot_id, language)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create tourist_spot_translations table")?;

        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl LanguageStore for PgLanguageStore {
    async fn fetch_item(&self, id: Uuid) -> Result<Option<ContentItem>> {
        let row = sqlx::query(
            "SELECT name, description, category, tips FROM tourist_spots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch tourist spot")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut item = ContentItem::new(
            ItemId::Persistent(id),
            row.try_get::<String, _>("name")?,
            row.try_get::<String, _>("description")?,
            row.try_get::<String, _>("category")?,
        )
        .with_tips(row.try_get::<Vec<String>, _>("tips")?);

        let rows = sqlx::query(
            "SELECT language, name, description, category, tips
             FROM tourist_spot_translations
             WHERE spot_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tourist spot translations")?;

        for row in rows {
            let code: String = row.try_get("language")?;
            let Ok(language) = Language::from_code(&code) else {
                debug!("Skipping stored translation in unsupported language '{}'", code);
                continue;
            };
            item.translations.insert(
                language,
                TranslationResult {
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    category: row.try_get("category")?,
                    tips: row.try_get("tips")?,
                },
            );
        }

        Ok(Some(item))
    }

    async fn read_translation(
        &self,
        id: Uuid,
        language: Language,
    ) -> Result<Option<TranslationResult>> {
        let row = sqlx::query(
            "SELECT name, description, category, tips
             FROM tourist_spot_translations
             WHERE spot_id = $1 AND language = $2",
        )
        .bind(id)
        .bind(language.code())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read translation")?;

        row.map(|row| -> Result<TranslationResult> {
            Ok(TranslationResult {
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                category: row.try_get("category")?,
                tips: row.try_get("tips")?,
            })
        })
        .transpose()
    }

    async fn upsert_translation(
        &self,
        id: Uuid,
        language: Language,
        translation: &TranslationResult,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO tourist_spot_translations
                (spot_id, language, name, description, category, tips, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             ON CONFLICT (spot_id, language) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                tips = EXCLUDED.tips,
                updated_at = NOW()",
        )
        .bind(id)
        .bind(language.code())
        .bind(&translation.name)
        .bind(&translation.description)
        .bind(&translation.category)
        .bind(&translation.tips)
        .execute(&self.pool)
        .await
        .context("Failed to save translation")?;

        Ok(())
    }
}

// ==================== In-memory ====================

/// Process-local store. Counts backend reads and writes so callers can
/// observe exactly which operations touched it.
#[derive(Default)]
pub struct InMemoryLanguageStore {
    items: RwLock<HashMap<Uuid, ContentItem>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryLanguageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a persistent item. Local items are rejected.
    pub fn insert_item(&self, item: ContentItem) -> Result<()> {
        let Some(id) = item.id.as_uuid() else {
            bail!("Only persistent items can be stored, got {}", item.id);
        };
        self.items.write().insert(id, item);
        Ok(())
    }

    /// Number of backend lookups (fetch + read).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of attempted upserts, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent upsert fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LanguageStore for InMemoryLanguageStore {
    async fn fetch_item(&self, id: Uuid) -> Result<Option<ContentItem>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.read().get(&id).cloned())
    }

    async fn read_translation(
        &self,
        id: Uuid,
        language: Language,
    ) -> Result<Option<TranslationResult>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .items
            .read()
            .get(&id)
            .and_then(|item| item.translations.get(&language).cloned()))
    }

    async fn upsert_translation(
        &self,
        id: Uuid,
        language: Language,
        translation: &TranslationResult,
    ) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("Simulated write failure");
        }

        let mut items = self.items.write();
        let Some(item) = items.get_mut(&id) else {
            bail!("Unknown tourist spot {}", id);
        };
        item.translations.insert(language, translation.clone());
        Ok(())
    }
}

// ==================== Accessor ====================

/// Translation slots addressed by `ItemId`.
#[derive(Clone)]
pub struct TranslationStore {
    backend: Arc<dyn LanguageStore>,
}

impl TranslationStore {
    pub fn new(backend: Arc<dyn LanguageStore>) -> Self {
        Self { backend }
    }

    /// Load a persistent item. Local ids resolve to `None` without I/O.
    pub async fn fetch_item(&self, id: &ItemId) -> Result<Option<ContentItem>> {
        match id.as_uuid() {
            Some(uuid) => self.backend.fetch_item(uuid).await,
            None => Ok(None),
        }
    }

    /// True iff name, description and category are all stored and non-empty.
    pub async fn has_translation(&self, id: &ItemId, language: Language) -> bool {
        self.read_translation(id, language).await.is_some()
    }

    /// The stored translation, only if it is complete. Lookup failures are
    /// treated as a miss.
    pub async fn read_translation(
        &self,
        id: &ItemId,
        language: Language,
    ) -> Option<TranslationResult> {
        let uuid = id.as_uuid()?;

        match self.backend.read_translation(uuid, language).await {
            Ok(Some(translation)) if translation.is_complete() => Some(translation),
            Ok(_) => None,
            Err(e) => {
                warn!("Translation lookup failed for {} ({}): {:#}", id, language, e);
                None
            }
        }
    }

    /// Persist a translation. Returns `false` without touching the backend
    /// for local items, and `false` after logging if the write fails.
    pub async fn write_translation(
        &self,
        id: &ItemId,
        language: Language,
        translation: &TranslationResult,
    ) -> bool {
        let Some(uuid) = id.as_uuid() else {
            return false;
        };

        match self
            .backend
            .upsert_translation(uuid, language, translation)
            .await
        {
            Ok(()) => {
                debug!("Saved {} translation for {}", language, id);
                true
            }
            Err(e) => {
                warn!("Failed to save {} translation for {}: {:#}", language, id, e);
                false
            }
        }
    }
}
