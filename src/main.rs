use anyhow::{Context, Result};
use legal_rag_api::{ApiConfig, ApiServer, AppState};
use legal_rag_common::RagConfig;
use legal_rag_core::RagCore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the filter reads RUST_LOG
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legal_rag=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting legal document assistant API...");

    let rag_config = RagConfig::from_env().context("failed to load pipeline configuration")?;
    info!("Pipeline configuration: {:?}", rag_config);

    let core = RagCore::new(&rag_config)
        .await
        .context("failed to initialise document pipeline")?;

    let api_config = ApiConfig::from_env();
    let server = ApiServer::new(api_config, AppState::new(core));

    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {}", e))?;

    Ok(())
}
