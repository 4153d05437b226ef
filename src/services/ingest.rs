//! Historical bar ingestion: keeps the store level with the provider for every symbol.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::scanner::partition;
use crate::error::{FetchError, ProviderError};
use crate::metrics::Metrics;
use crate::models::Granularity;
use crate::services::historical::HistoricalStore;
use crate::services::market_data::{ChartSource, SymbolSource};

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub divisor: usize,
    pub lookback: chrono::Duration,
    pub granularity: Granularity,
    pub rate_limit: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            divisor: 25,
            lookback: chrono::Duration::days(5),
            granularity: Granularity::OneDay,
            rate_limit: Duration::ZERO,
        }
    }
}

/// Result of ingesting one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored bar count already matched the provider's; nothing was written.
    UpToDate,
    /// Provider had more bars than the store; this many were new.
    Written(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub instruments: usize,
    /// Store already held at least as many bars as the provider returned.
    pub up_to_date: usize,
    pub bars_written: usize,
    pub failed: usize,
}

impl IngestReport {
    fn merge(&mut self, other: &IngestReport) {
        self.instruments += other.instruments;
        self.up_to_date += other.up_to_date;
        self.bars_written += other.bars_written;
        self.failed += other.failed;
    }
}

#[derive(Clone)]
pub struct Ingestor {
    symbols: Arc<dyn SymbolSource>,
    chart: Arc<dyn ChartSource>,
    store: Arc<dyn HistoricalStore>,
    config: IngestConfig,
    metrics: Option<Arc<Metrics>>,
}

impl Ingestor {
    pub fn new(
        symbols: Arc<dyn SymbolSource>,
        chart: Arc<dyn ChartSource>,
        store: Arc<dyn HistoricalStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            symbols,
            chart,
            store,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// One pass over the provider's full symbol list. Only the symbol lookup itself is
    /// fatal; per-instrument failures are logged and counted.
    pub async fn run(&self) -> Result<IngestReport, ProviderError> {
        let universe = self.symbols.symbols().await?;
        let partitions = partition(&universe, self.config.divisor);
        info!(
            instruments = universe.len(),
            partitions = partitions.len(),
            "Ingest: starting pass"
        );

        let mut workers = JoinSet::new();
        for (idx, instruments) in partitions.into_iter().enumerate() {
            let ingestor = self.clone();
            workers.spawn(async move { ingestor.ingest_partition(idx, instruments).await });
        }

        let mut report = IngestReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(partial) => report.merge(&partial),
                Err(e) => error!(error = %e, "Ingest: partition worker aborted"),
            }
        }

        info!(
            instruments = report.instruments,
            written = report.bars_written,
            up_to_date = report.up_to_date,
            failed = report.failed,
            "Ingest: pass finished"
        );
        Ok(report)
    }

    async fn ingest_partition(&self, idx: usize, instruments: Vec<String>) -> IngestReport {
        let thread_id = format!("Thread-{}", idx + 1);
        let mut report = IngestReport::default();

        for (position, instrument) in instruments.iter().enumerate() {
            if position > 0 && !self.config.rate_limit.is_zero() {
                tokio::time::sleep(self.config.rate_limit).await;
            }
            info!(worker = %thread_id, symbol = %instrument, "Processing ticker {}", instrument);
            report.instruments += 1;

            match self.ingest_instrument(instrument).await {
                Ok(IngestOutcome::UpToDate) => report.up_to_date += 1,
                Ok(IngestOutcome::Written(written)) => report.bars_written += written,
                Err(e) => {
                    warn!(worker = %thread_id, symbol = %instrument, error = %e, "Ingest failed for {}", instrument);
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub async fn ingest_instrument(&self, instrument: &str) -> Result<IngestOutcome, FetchError> {
        let start = Utc::now()
            .checked_sub_signed(self.config.lookback)
            .ok_or(FetchError::LookbackOutOfRange(self.config.lookback))?;
        let stored = self.store.range(instrument, start, None).await?.len();
        let provided = self
            .chart
            .chart(instrument, start, None, self.config.granularity)
            .await?;

        debug!(symbol = %instrument, stored = stored, provided = provided.len(), "Comparing bar counts");
        if stored >= provided.len() {
            debug!(symbol = %instrument, "Skipping record insertion for {}", instrument);
            return Ok(IngestOutcome::UpToDate);
        }

        let written = self.store.write_batch(instrument, &provided).await?;
        if let Some(ref metrics) = self.metrics {
            metrics.bars_ingested_total.inc_by(written as f64);
        }
        Ok(IngestOutcome::Written(written))
    }
}
