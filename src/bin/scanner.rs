//! jtrader Scanner
//!
//! Evaluates the configured indicator chain across the whole instrument universe,
//! once or on a repeating schedule.

use dotenvy::dotenv;
use jtrader::config::{AppConfig, Universe};
use jtrader::core::http::{start_server, AppState};
use jtrader::core::scanner::Scanner;
use jtrader::core::scheduler::PassSchedule;
use jtrader::db::QuestDatabase;
use jtrader::indicators::IndicatorRegistry;
use jtrader::logging;
use jtrader::metrics::Metrics;
use jtrader::services::historical::{HistoricalStore, MemoryHistoricalStore};
use jtrader::services::kucoin::KucoinProvider;
use jtrader::services::market_data::SymbolSource;
use jtrader::signals::ChainSpec;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = AppConfig::from_env()?;
    info!(
        sandbox = config.sandbox,
        mode = %config.mode,
        divisor = config.divisor,
        rate_limit_ms = config.rate_limit.as_millis() as u64,
        "Starting jtrader Scanner"
    );

    // fail fast on unknown indicator keys
    let registry = Arc::new(IndicatorRegistry::with_defaults());
    let chain = ChainSpec::resolve(config.chain_name.clone(), &config.indicators, registry)?
        .with_policy(config.sign_policy);
    info!(chain = %chain.name(), indicators = ?chain.keys(), "Chain resolved");

    let metrics = Arc::new(Metrics::new()?);
    if let Some(port) = config.http_port {
        let state = AppState::new("scanner", metrics.clone());
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!(error = %e, "HTTP server failed");
            }
        });
    }

    let provider = Arc::new(KucoinProvider::new(config.kucoin_api_url.clone()));
    let store: Arc<dyn HistoricalStore> = match QuestDatabase::new().await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            warn!(error = %e, "QuestDB unavailable, using in-memory store");
            Arc::new(MemoryHistoricalStore::new())
        }
    };

    let universe = match config.universe {
        Universe::Provider => provider.symbols().await?,
        Universe::Symbols(ref symbols) => symbols.clone(),
    };
    if universe.is_empty() {
        warn!("Universe is empty, nothing to scan");
        return Ok(());
    }

    let scanner = Scanner::new(provider, store, config.notifier(), config.scanner_config())
        .with_metrics(metrics);

    if config.scan_interval_seconds == 0 {
        let report = scanner.run(&universe, &chain, config.mode).await;
        info!(report = ?report, "Single pass complete");
        return Ok(());
    }

    let schedule = PassSchedule::new(config.scan_interval_seconds)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutting down scanner after the current pass...");
            let _ = shutdown_tx.send(true);
        }
    });

    let reports = scanner
        .run_scheduled(&universe, &chain, config.mode, &schedule, shutdown_rx)
        .await;
    info!(passes = reports.len(), "Scanner stopped");
    Ok(())
}
