use crate::config::Config;
use crate::content::TranslationResult;
use crate::i18n::Language;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to an external text or speech provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider credentials are not configured")]
    NotConfigured,

    #[error("provider request failed: {0}")]
    Call(String),

    #[error("provider returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
        /// Seconds from a `Retry-After` header, when present.
        retry_after: Option<u64>,
    },

    #[error("provider output is not a valid translation: {0}")]
    Format(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::Status { status: 429, .. })
    }
}

/// Produces translations for content the store does not have yet.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        source: &TranslationResult,
        target: Language,
    ) -> Result<TranslationResult, ProviderError>;
}

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Exactly the object the prompt asks the model for.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TranslatedSpot {
    name: String,
    description: String,
    category: String,
    tips: Vec<String>,
}

/// Translator backed by the OpenAI chat completions API.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl OpenAiTranslator {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_url: api_url.into(),
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        let api_key = config.openai_api_key.as_ref()?;
        Some(Self::new(
            client,
            api_key.clone(),
            config.openai_model.clone(),
            config.openai_api_url.clone(),
        ))
    }
}

#[async_trait]
impl TranslationProvider for OpenAiTranslator {
    async fn translate(
        &self,
        source: &TranslationResult,
        target: Language,
    ) -> Result<TranslationResult, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_translation_system_prompt(target.name()),
                },
                Message {
                    role: "user".to_string(),
                    content: build_translation_user_prompt(source, target.name()),
                },
            ],
            temperature: 0.3,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Format(format!("unreadable completion: {}", e)))?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ProviderError::Format("completion contained no choices".to_string()))?;

        parse_translation(content)
    }
}

/// Seconds from a `Retry-After` header given in delta-seconds form.
pub(crate) fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn build_translation_system_prompt(target_language: &str) -> String {
    format!(
        r#"You are a professional translator for a Rio de Janeiro tourist guide. Translate tourist spot content from Portuguese to {}.

## Translation Rules

- Use the established {} name for famous landmarks (e.g., "Cristo Redentor" in English is "Christ the Redeemer")
- Keep street addresses, neighbourhood names, phone numbers, URLs, prices and opening hours unchanged
- Translate the category as a short label
- Keep the same number of tips, in the same order
- Keep a friendly, informative tone

## Output

Respond with a single JSON object and nothing else, with exactly these keys:
{{"name": string, "description": string, "category": string, "tips": [string]}}"#,
        target_language, target_language
    )
}

fn build_translation_user_prompt(source: &TranslationResult, target_language: &str) -> String {
    let tips = if source.tips.is_empty() {
        "(no tips)".to_string()
    } else {
        source
            .tips
            .iter()
            .enumerate()
            .map(|(i, tip)| format!("{}. {}", i + 1, tip))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Translate this tourist spot to {}:\n\nName: {}\nDescription: {}\nCategory: {}\nTips:\n{}",
        target_language, source.name, source.description, source.category, tips
    )
}

static CODE_FENCE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Remove a surrounding ```json ... ``` fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let regex = CODE_FENCE_REGEX.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n?(.*?)\s*```\s*$").unwrap()
    });

    match regex.captures(content).and_then(|cap| cap.get(1)) {
        Some(inner) => inner.as_str(),
        None => content.trim(),
    }
}

/// Parse the provider's structured output.
fn parse_translation(content: &str) -> Result<TranslationResult, ProviderError> {
    let spot: TranslatedSpot = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ProviderError::Format(e.to_string()))?;

    Ok(TranslationResult {
        name: spot.name,
        description: spot.description,
        category: spot.category,
        tips: spot.tips,
    })
}
