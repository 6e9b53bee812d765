//! Preview binary - translates one tourist spot without touching the database
//!
//! Usage:
//!   cargo run --bin preview -- --lang en --name "Cristo Redentor" \
//!       --description "Estátua no alto do Corcovado." --category Natureza \
//!       --tip "Vá cedo para evitar filas"
//!
//! Required environment variables:
//! - OPENAI_API_KEY
//!
//! Optional:
//! - OPENAI_MODEL (defaults to gpt-4o-mini)
//! - OPENAI_API_URL (defaults to the public chat completions endpoint)

use anyhow::{Context, Result};
use std::sync::Arc;
use tourist_translate::content::{ContentItem, InlineItem, ItemId};
use tourist_translate::i18n::{Language, TranslationValidator};
use tourist_translate::provider::OpenAiTranslator;
use tourist_translate::resolver::Resolver;
use tourist_translate::store::InMemoryLanguageStore;
use tracing::info;

/// Minimal config for preview (no database required)
struct PreviewConfig {
    openai_api_key: String,
    openai_model: String,
    openai_api_url: String,
}

impl PreviewConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
        })
    }
}

struct PreviewArgs {
    language: String,
    item: InlineItem,
}

fn parse_args(args: &[String]) -> Result<PreviewArgs> {
    let mut language = None;
    let mut name = None;
    let mut description = None;
    let mut category = None;
    let mut tips = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .with_context(|| format!("{} expects a value", flag))
        };
        match flag.as_str() {
            "--lang" => language = Some(value()?),
            "--name" => name = Some(value()?),
            "--description" => description = Some(value()?),
            "--category" => category = Some(value()?),
            "--tip" => tips.push(value()?),
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    Ok(PreviewArgs {
        language: language.unwrap_or_else(|| "en".to_string()),
        item: InlineItem {
            name: name.context("--name is required")?,
            description: description.context("--description is required")?,
            category: category.context("--category is required")?,
            tips: if tips.is_empty() { None } else { Some(tips) },
        },
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tourist_translate=info".parse()?),
        )
        .init();

    // Load environment from .env file
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let preview_args = parse_args(&args)?;
    let target = Language::from_code(&preview_args.language)?;

    info!("Loading configuration...");
    let config = PreviewConfig::from_env()?;

    let translator = OpenAiTranslator::new(
        reqwest::Client::new(),
        config.openai_api_key,
        config.openai_model,
        config.openai_api_url,
    );
    let resolver = Resolver::new(
        Arc::new(InMemoryLanguageStore::new()),
        Some(Arc::new(translator)),
    );

    let item = ContentItem::from_inline(ItemId::parse("preview"), preview_args.item);
    item.validate()?;

    info!("Translating '{}' into {}...", item.name, target.name());
    let translation = resolver.resolve(&item, target).await?;
    let report = TranslationValidator::validate(&item.source(), &translation);

    println!();
    println!("--- Source ({}) ---", Language::canonical());
    println!("{}", serde_json::to_string_pretty(&item.source())?);
    println!();
    println!("--- Translation ({}) ---", target);
    println!("{}", serde_json::to_string_pretty(&translation)?);
    println!();
    if translation == item.source() {
        println!("⚠️  Provider unavailable or rejected, source returned unchanged");
    }
    for warning in &report.warnings {
        println!("⚠️  {}", warning);
    }
    println!();

    Ok(())
}
