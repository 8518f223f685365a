use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wavetape::controllers::conversion::ConversionController;
use wavetape::domain::conversion::{ConversionRegistry, ConversionService};
use wavetape::domain::tts::{LanguageVoiceSelector, TtsClient};
use wavetape::infrastructure::config::{Config, LogFormat};
use wavetape::infrastructure::http::{create_router, start_http_server};
use wavetape::infrastructure::repositories::HttpTtsRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Wavetape on {}:{}", config.host, config.port);
    tracing::info!(
        backend = ?config.backend,
        pipeline = ?config.pipeline,
        "TTS configuration loaded"
    );

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Backend repository
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("wavetape/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let tts_repo = Arc::new(HttpTtsRepository::new(
        http_client,
        config.backend.clone(),
    ));

    // 2. Voice selection and the resilient client
    let voices = Arc::new(LanguageVoiceSelector::new(
        config.voices.default_voice.clone(),
        config.voices.french_voice.clone(),
    ));
    let tts_client = Arc::new(TtsClient::new(
        tts_repo,
        voices,
        config.pipeline.client_settings(),
    ));

    // 3. Services
    let conversion_service = Arc::new(ConversionService::new(
        tts_client,
        config.pipeline.max_segment_length,
    ));
    let registry = ConversionRegistry::new(
        conversion_service.clone(),
        config.pipeline.job_idle_ttl(),
    );

    // 4. Controllers
    let conversion_controller = Arc::new(ConversionController::new(
        conversion_service,
        registry,
    ));

    let app = create_router(&config, conversion_controller);
    start_http_server(config, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wavetape=debug,tower_http=debug".into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
