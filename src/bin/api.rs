use invoice_evaluation::{
    api::start_server,
    config::AppConfig,
    evaluation::EvaluationService,
    classification::HttpClassificationClient,
    Result,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env and environment variables; a bad base URL stops startup here
    let config = AppConfig::from_env()?;

    info!("Invoice Evaluation Service - API Server");
    info!("Port: {}", config.port);
    info!("Classification service: {}", config.classification.base_url);

    // Create components
    let classifier = HttpClassificationClient::new(
        &config.classification.base_url,
        config.classification.timeout,
    )?;
    let evaluator = Arc::new(EvaluationService::with_default_rules(Arc::new(classifier)));

    info!("Evaluation service initialized");

    // Start API server
    start_server(evaluator, config.port).await?;

    Ok(())
}
