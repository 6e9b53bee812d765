use anyhow::Result;
use std::sync::Arc;
use tourist_translate::config::Config;
use tourist_translate::provider::{OpenAiTranslator, TranslationProvider};
use tourist_translate::resolver::Resolver;
use tourist_translate::server::{self, AppState};
use tourist_translate::speech::{FsObjectStore, OpenAiSpeech, SpeechCache, SpeechProvider};
use tourist_translate::store::PgLanguageStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tourist_translate=info".parse()?),
        )
        .init();

    info!("Starting tourist translation service");

    let config = Config::from_env()?;

    info!("Connecting to language store");
    let store = PgLanguageStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let client = reqwest::Client::new();

    if !config.has_provider_credentials() {
        warn!("OPENAI_API_KEY not set, /translate and uncached /speech will answer 503");
    }

    let translator = OpenAiTranslator::from_config(client.clone(), &config)
        .map(|translator| Arc::new(translator) as Arc<dyn TranslationProvider>);
    let narrator = OpenAiSpeech::from_config(client, &config)
        .map(|speech| Arc::new(speech) as Arc<dyn SpeechProvider>);

    let resolver = Resolver::new(Arc::new(store), translator)
        .with_timeout(config.provider_timeout())
        .with_memo_capacity(config.memo_capacity);

    let speech = SpeechCache::new(
        Arc::new(FsObjectStore::new(&config.audio_storage_dir)),
        narrator,
        config.audio_namespace.clone(),
    )
    .with_timeout(config.provider_timeout());

    if config.api_key.is_none() {
        warn!("API_KEY not set, endpoints are open to any caller");
    }

    let state = Arc::new(AppState::new(
        Arc::new(resolver),
        Arc::new(speech),
        config.api_key.clone(),
    ));

    server::serve(state, config.port).await
}
