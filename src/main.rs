use std::sync::Arc;

use inbox_triage::config::Config;
use inbox_triage::error::ConfigError;
use inbox_triage::llm::{EmailClassifier, GeminiClient};
use inbox_triage::normalize::TextNormalizer;
use inbox_triage::server::classify_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load .env before reading any configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingEnvVar(key)) => {
            eprintln!("Error: {} not set", key);
            eprintln!("  export {}=...", key);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let normalizer = Arc::new(TextNormalizer::new());
    let classifier: Arc<dyn EmailClassifier> = Arc::new(GeminiClient::new(&config.gemini)?);

    eprintln!("📬 Inbox Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", classifier.model_name());
    eprintln!(
        "   Classify: http://{}:{}/classify",
        config.server.host, config.server.port
    );
    eprintln!(
        "   Health: http://{}:{}/health\n",
        config.server.host, config.server.port
    );

    let app = classify_routes(Arc::clone(&classifier), normalizer, &config.server);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        model = classifier.model_name(),
        "Classification server started"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
