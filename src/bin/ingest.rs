//! jtrader Ingest
//!
//! Brings the QuestDB bar store level with KuCoin for every listed symbol.

use dotenvy::dotenv;
use jtrader::config::AppConfig;
use jtrader::db::QuestDatabase;
use jtrader::logging;
use jtrader::metrics::Metrics;
use jtrader::services::ingest::{IngestConfig, Ingestor};
use jtrader::services::kucoin::KucoinProvider;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = AppConfig::from_env()?;
    info!(sandbox = config.sandbox, divisor = config.divisor, "Starting jtrader Ingest");

    let database = QuestDatabase::new().await?;
    let provider = Arc::new(KucoinProvider::new(config.kucoin_api_url.clone()));
    let metrics = Arc::new(Metrics::new()?);

    let ingestor = Ingestor::new(
        provider.clone(),
        provider,
        Arc::new(database),
        IngestConfig {
            divisor: config.divisor,
            rate_limit: config.rate_limit,
            ..IngestConfig::default()
        },
    )
    .with_metrics(metrics);

    let report = ingestor.run().await?;
    info!(report = ?report, "Ingest complete");
    Ok(())
}
