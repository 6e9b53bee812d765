use anyhow::{Context, Result};
use std::time::Duration;

/// Bounds applied to the provider timeout so a misconfigured value can't
/// hang a request or make every call time out.
const MIN_PROVIDER_TIMEOUT_SECS: u64 = 10;
const MAX_PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // OpenAI (translation + speech). Missing key disables both providers.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub openai_speech_url: String,
    pub openai_speech_model: String,
    pub openai_speech_voice: String,
    pub provider_timeout_secs: u64,

    // Audio cache
    pub audio_storage_dir: String,
    pub audio_namespace: String,

    // Ephemeral translation memo
    pub memo_capacity: usize,

    // Server
    pub api_key: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            openai_speech_url: std::env::var("OPENAI_SPEECH_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/audio/speech".to_string()),
            openai_speech_model: std::env::var("OPENAI_SPEECH_MODEL")
                .unwrap_or_else(|_| "tts-1".to_string()),
            openai_speech_voice: std::env::var("OPENAI_SPEECH_VOICE")
                .unwrap_or_else(|_| "nova".to_string()),
            provider_timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(clamp_timeout)
                .unwrap_or(20),

            // Audio cache
            audio_storage_dir: std::env::var("AUDIO_STORAGE_DIR")
                .unwrap_or_else(|_| "data/audio".to_string()),
            audio_namespace: std::env::var("AUDIO_NAMESPACE")
                .unwrap_or_else(|_| "tts-cache".to_string()),

            memo_capacity: std::env::var("MEMO_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v: &usize| v > 0)
                .unwrap_or(512),

            // Server
            api_key: std::env::var("API_KEY").ok().filter(|v| !v.is_empty()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn has_provider_credentials(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_PROVIDER_TIMEOUT_SECS, MAX_PROVIDER_TIMEOUT_SECS)
}
