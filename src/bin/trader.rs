//! jtrader Trader
//!
//! One streaming trader per configured symbol, each keeping a rolling window from the
//! KuCoin candle feed.

use dotenvy::dotenv;
use jtrader::config::{AppConfig, Universe};
use jtrader::core::http::{start_server, AppState};
use jtrader::core::trader::{run_traders, Trader, TraderConfig};
use jtrader::indicators::IndicatorRegistry;
use jtrader::logging;
use jtrader::metrics::Metrics;
use jtrader::services::kucoin::{KucoinDecoder, KucoinProvider};
use jtrader::signals::ChainSpec;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = AppConfig::from_env()?;
    let symbols = match config.universe {
        Universe::Symbols(ref symbols) if !symbols.is_empty() => symbols.clone(),
        _ => return Err("trader requires SYMBOLS to be set".into()),
    };
    info!(symbols = ?symbols, capacity = config.trader_capacity, "Starting jtrader Trader");

    let registry = Arc::new(IndicatorRegistry::with_defaults());
    let chain = ChainSpec::resolve(config.chain_name.clone(), &config.indicators, registry)?
        .with_policy(config.sign_policy);

    let metrics = Arc::new(Metrics::new()?);
    if let Some(port) = config.http_port {
        let state = AppState::new("trader", metrics.clone());
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!(error = %e, "HTTP server failed");
            }
        });
    }

    let provider = Arc::new(KucoinProvider::new(config.kucoin_api_url.clone()));
    let decoder = Arc::new(KucoinDecoder);
    let notifier = config.notifier();
    let trader_config = TraderConfig {
        capacity: config.trader_capacity,
        granularity: config.granularity,
        ..TraderConfig::default()
    };

    let traders: Vec<Trader> = symbols
        .iter()
        .map(|symbol| {
            Trader::new(
                symbol.clone(),
                provider.clone(),
                provider.clone(),
                decoder.clone(),
                notifier.clone(),
                chain.clone(),
                trader_config.clone(),
            )
            .with_metrics(metrics.clone())
        })
        .collect();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutting down traders...");
            let _ = shutdown_tx.send(true);
        }
    });

    let results = run_traders(traders, shutdown_rx).await;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    info!(traders = results.len(), failed = failed, "Traders stopped");
    Ok(())
}
