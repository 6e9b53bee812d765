//! Audio narration with an object-storage cache.
//!
//! Narration for a text lives at `{namespace}/{fingerprint}.mp3`. A stored
//! blob is served as-is; otherwise the speech provider synthesizes it, the
//! blob is written back in the background, and the fresh audio is returned.
//! Unlike translation there is no safe fallback, so provider failures are
//! reported to the caller.

use crate::config::Config;
use crate::fingerprint::fingerprint;
use crate::i18n::TranslationMetrics;
use crate::provider::{retry_after_secs, ProviderError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Longest input the speech endpoint accepts.
pub const MAX_SPEECH_CHARS: usize = 4096;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("text is required")]
    EmptyText,

    #[error("text is {actual} characters, limit is {max}")]
    TooLong { max: usize, actual: usize },

    #[error("speech provider is not configured")]
    NotConfigured,

    #[error("speech provider is rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for SpeechError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::NotConfigured => SpeechError::NotConfigured,
            ProviderError::Status {
                status: 429,
                retry_after,
                ..
            } => SpeechError::RateLimited { retry_after },
            other => SpeechError::Provider(other),
        }
    }
}

// ==================== Object storage ====================

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Blobs stored as files under a root directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            anyhow::bail!("Invalid object path: {}", path);
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full_path = self.resolve(path)?;
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(format!("Failed to read {}", full_path.display())),
        }
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&full_path, bytes)
            .await
            .context(format!("Failed to write {}", full_path.display()))?;
        Ok(())
    }
}

/// Process-local blob store.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().contains_key(path)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.lock().get(path).cloned())
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().insert(path.to_string(), bytes);
        Ok(())
    }
}

// ==================== Speech provider ====================

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize MP3 audio for `text`.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

/// Speech backed by the OpenAI audio API.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    voice: String,
}

impl OpenAiSpeech {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: model.into(),
            voice: voice.into(),
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        let api_key = config.openai_api_key.as_ref()?;
        Some(Self::new(
            client,
            api_key.clone(),
            config.openai_speech_url.clone(),
            config.openai_speech_model.clone(),
            config.openai_speech_voice.clone(),
        ))
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Call(e.to_string()))?;

        if audio.is_empty() {
            return Err(ProviderError::Format("empty audio response".to_string()));
        }

        Ok(audio.to_vec())
    }
}

// ==================== Cache ====================

pub struct SpeechCache {
    storage: Arc<dyn ObjectStore>,
    provider: Option<Arc<dyn SpeechProvider>>,
    namespace: String,
    timeout: Duration,
    metrics: &'static TranslationMetrics,
    pending: Mutex<JoinSet<()>>,
}

impl SpeechCache {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        provider: Option<Arc<dyn SpeechProvider>>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            provider,
            namespace: namespace.into(),
            timeout: DEFAULT_TIMEOUT,
            metrics: TranslationMetrics::global(),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Storage path for the narration of `text`.
    pub fn cache_path(&self, text: &str) -> String {
        format!("{}/{}.mp3", self.namespace, fingerprint(text))
    }

    /// MP3 narration for `text`, from storage when possible.
    pub async fn narrate(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }
        let length = text.chars().count();
        if length > MAX_SPEECH_CHARS {
            return Err(SpeechError::TooLong {
                max: MAX_SPEECH_CHARS,
                actual: length,
            });
        }

        let path = self.cache_path(text);

        match self.storage.get(&path).await {
            Ok(Some(audio)) => {
                self.metrics.record_audio_hit();
                debug!("Audio cache hit: {}", path);
                return Ok(audio);
            }
            Ok(None) => debug!("Audio cache miss: {}", path),
            Err(e) => warn!("Audio cache lookup failed for {}: {:#}", path, e),
        }
        self.metrics.record_audio_miss();

        let provider = self.provider.as_ref().ok_or(SpeechError::NotConfigured)?;

        let audio = match tokio::time::timeout(self.timeout, provider.synthesize(text)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(self.timeout).into()),
        };

        self.store_in_background(path, audio.clone());
        Ok(audio)
    }

    fn store_in_background(&self, path: String, audio: Vec<u8>) {
        let storage = Arc::clone(&self.storage);

        let mut pending = self.pending.lock();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if let Err(e) = storage.put(&path, audio).await {
                warn!("Failed to cache audio at {}: {:#}", path, e);
            }
        });
    }

    /// Wait for every background write spawned so far.
    pub async fn drain_pending(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        while pending.join_next().await.is_some() {}
        if count > 0 {
            info!("Flushed {} pending audio writes", count);
        }
    }
}
