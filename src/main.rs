use anyhow::Result;
use taiwan_guide::{AppConfig, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    // reqwest and axum-server both pull in rustls; pin one crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = AppConfig::load()?;
    let _telemetry = telemetry::init(&config.logging, &config.telemetry)?;

    tracing::info!(version = taiwan_guide::VERSION, "Starting Taiwan guide");

    web::run(config).await
}
