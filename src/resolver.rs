//! Translated content resolver.
//!
//! `Resolver::resolve` always produces displayable text for an item:
//!
//! 1. canonical language: the item's own fields, no I/O
//! 2. translation already loaded with the item
//! 3. memo of translations produced by this process
//! 4. language store (persistent items)
//! 5. provider call, bounded by a timeout
//! 6. memo insert and, for persistent items, a write-back spawned and never
//!    awaited by the caller
//!
//! Any provider failure falls back to the source fields. Only invalid input
//! and unknown items are reported as errors.

use crate::content::{ContentItem, InlineItem, ItemId, TranslationResult, ValidationError};
use crate::fingerprint::fingerprint_fields;
use crate::i18n::{Language, TranslationMetrics, TranslationValidator};
use crate::provider::{ProviderError, TranslationProvider};
use crate::store::{LanguageStore, TranslationStore};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MEMO_CAPACITY: usize = 512;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid content: {0}")]
    Validation(#[from] ValidationError),

    #[error("tourist spot not found")]
    NotFound,

    #[error("language store unavailable: {0:#}")]
    Store(anyhow::Error),
}

/// What a caller asks for: an item by id, inline content, or both.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub item_id: Option<ItemId>,
    pub inline_item: Option<InlineItem>,
    pub target: Language,
}

struct MemoEntry {
    source: TranslationResult,
    translation: TranslationResult,
}

/// Bounded cache of translations produced by this process. Local items
/// live only here; persistent items are also written to the store.
/// Entries are keyed by a fingerprint of the source text and verified
/// against it on lookup.
struct TranslationMemo {
    inner: Mutex<LruCache<(Language, String), MemoEntry>>,
}

impl TranslationMemo {
    fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn key(source: &TranslationResult, language: Language) -> (Language, String) {
        let fields = [
            source.name.as_str(),
            source.description.as_str(),
            source.category.as_str(),
        ]
        .into_iter()
        .chain(source.tips.iter().map(String::as_str));
        (language, fingerprint_fields(fields))
    }

    fn get(&self, source: &TranslationResult, language: Language) -> Option<TranslationResult> {
        let mut memo = self.inner.lock();
        memo.get(&Self::key(source, language))
            .filter(|entry| entry.source == *source)
            .map(|entry| entry.translation.clone())
    }

    fn insert(&self, source: TranslationResult, language: Language, translation: TranslationResult) {
        let key = Self::key(&source, language);
        self.inner.lock().put(key, MemoEntry { source, translation });
    }
}

pub struct Resolver {
    store: TranslationStore,
    provider: Option<Arc<dyn TranslationProvider>>,
    memo: TranslationMemo,
    timeout: Duration,
    metrics: &'static TranslationMetrics,
    pending: Mutex<JoinSet<()>>,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn LanguageStore>,
        provider: Option<Arc<dyn TranslationProvider>>,
    ) -> Self {
        Self {
            store: TranslationStore::new(store),
            provider,
            memo: TranslationMemo::new(DEFAULT_MEMO_CAPACITY),
            timeout: DEFAULT_TIMEOUT,
            metrics: TranslationMetrics::global(),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo = TranslationMemo::new(capacity);
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Find the source item for a request.
    ///
    /// A persistent id found in the store wins. Otherwise inline content is
    /// used, validated, under the supplied id (or one derived from the text).
    /// Inline content has no stored row, so its id is always local.
    pub async fn load_item(&self, request: &TranslationRequest) -> Result<ContentItem, ResolveError> {
        if let Some(id) = &request.item_id {
            match self.store.fetch_item(id).await {
                Ok(Some(item)) => return Ok(item),
                Ok(None) => debug!("Tourist spot {} not in store", id),
                Err(e) if request.inline_item.is_some() => {
                    warn!("Store lookup for {} failed, using inline content: {:#}", id, e);
                }
                Err(e) => return Err(ResolveError::Store(e)),
            }
        }

        let Some(inline) = request.inline_item.clone() else {
            return Err(ResolveError::NotFound);
        };

        let id = request
            .item_id
            .as_ref()
            .map(ItemId::to_local)
            .unwrap_or_else(|| {
                let source = [&inline.name, &inline.description, &inline.category];
                ItemId::Local(format!(
                    "inline-{}",
                    fingerprint_fields(source.iter().map(|s| s.as_str()))
                ))
            });

        let item = ContentItem::from_inline(id, inline);
        item.validate()?;
        Ok(item)
    }

    /// Load the item a request refers to and resolve it.
    pub async fn resolve_request(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, ResolveError> {
        let item = self.load_item(request).await?;
        self.resolve(&item, request.target).await
    }

    /// Produce text for `item` in `target`, preferring data that already exists.
    pub async fn resolve(
        &self,
        item: &ContentItem,
        target: Language,
    ) -> Result<TranslationResult, ResolveError> {
        if target.is_canonical() {
            return Ok(item.source());
        }

        if let Some(translation) = item.loaded_translation(target) {
            self.metrics.record_cache_hit();
            debug!("Using loaded {} translation for {}", target, item.id);
            return Ok(translation.clone());
        }

        let source = item.source();

        let cached = match self.memo.get(&source, target) {
            Some(translation) => Some(translation),
            None if item.id.is_persistent() => {
                self.store.read_translation(&item.id, target).await
            }
            None => None,
        };
        if let Some(translation) = cached {
            self.metrics.record_cache_hit();
            debug!("Cache hit for {} ({})", item.id, target);
            return Ok(translation);
        }

        self.metrics.record_cache_miss();
        item.validate()?;

        match self.translate(&source, target).await {
            Ok(translation) => {
                self.remember(item, source, target, translation.clone());
                Ok(translation)
            }
            Err(e) => {
                self.metrics.record_fallback();
                warn!(
                    "Translation of {} to {} failed, serving source text: {}",
                    item.id,
                    target.name(),
                    e
                );
                Ok(source)
            }
        }
    }

    /// Call the provider and vet its output.
    async fn translate(
        &self,
        source: &TranslationResult,
        target: Language,
    ) -> Result<TranslationResult, ProviderError> {
        let provider = self.provider.as_ref().ok_or(ProviderError::NotConfigured)?;

        self.metrics.record_api_call();
        let outcome = match tokio::time::timeout(self.timeout, provider.translate(source, target))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        };

        let result = outcome.and_then(|translation| {
            let validation = TranslationValidator::validate(source, &translation);
            if validation.has_warnings() {
                warn!(
                    "Translation validation warnings for {} ({}): {:?}",
                    target.name(),
                    target.code(),
                    validation.warnings
                );
            }
            if validation.has_errors() {
                return Err(ProviderError::Format(validation.errors.join("; ")));
            }
            Ok(translation)
        });

        if result.is_err() {
            self.metrics.record_api_failure();
        }
        result
    }

    /// Keep a fresh translation for next time: always in the memo, and in
    /// the store (in the background) for persistent items.
    fn remember(
        &self,
        item: &ContentItem,
        source: TranslationResult,
        target: Language,
        translation: TranslationResult,
    ) {
        self.memo.insert(source, target, translation.clone());
        if !item.id.is_persistent() {
            return;
        }

        let store = self.store.clone();
        let id = item.id.clone();
        let metrics = self.metrics;

        let mut pending = self.pending.lock();
        // Reap finished writes so the set only holds in-flight ones
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if !store.write_translation(&id, target, &translation).await {
                metrics.record_persist_failure();
            }
        });
    }

    /// Wait for every background write spawned so far.
    pub async fn drain_pending(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        while pending.join_next().await.is_some() {}
        if count > 0 {
            info!("Flushed {} pending translation writes", count);
        }
    }
}
