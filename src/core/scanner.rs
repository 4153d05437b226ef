//! Batch scanner: partitions an instrument universe and evaluates a chain for every
//! instrument, one worker task per partition.
//!
//! Workers share only read-only collaborators. Within a partition instruments are
//! processed strictly in order with a cooperative delay between them; a failure on one
//! instrument is logged and never aborts the partition or the pass.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::scheduler::PassSchedule;
use crate::error::FetchError;
use crate::metrics::Metrics;
use crate::models::{Granularity, PeriodMode, Window};
use crate::services::historical::HistoricalStore;
use crate::services::market_data::ChartSource;
use crate::services::notifier::Notifier;
use crate::signals::ChainSpec;

pub const PRODUCTION_DIVISOR: usize = 25;
pub const SANDBOX_DIVISOR: usize = 2;
pub const PRODUCTION_RATE_LIMIT: Duration = Duration::from_millis(500);
pub const SANDBOX_RATE_LIMIT: Duration = Duration::from_secs(2);

/// Split `universe` into `max(1, floor(len / divisor))` contiguous partitions whose sizes
/// differ by at most one. Order is preserved and every instrument lands in exactly one
/// partition.
pub fn partition<T: Clone>(universe: &[T], divisor: usize) -> Vec<Vec<T>> {
    let count = (universe.len() / divisor.max(1)).max(1);
    let base = universe.len() / count;
    let extra = universe.len() % count;

    let mut partitions = Vec::with_capacity(count);
    let mut offset = 0;
    for idx in 0..count {
        let size = base + usize::from(idx < extra);
        partitions.push(universe[offset..offset + size].to_vec());
        offset += size;
    }
    partitions
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub divisor: usize,
    /// Pause between consecutive instruments inside one partition.
    pub rate_limit: Duration,
    pub granularity: Granularity,
    pub intraday_lookback: chrono::Duration,
    pub swing_lookback: chrono::Duration,
}

impl ScannerConfig {
    pub fn production() -> Self {
        Self {
            divisor: PRODUCTION_DIVISOR,
            rate_limit: PRODUCTION_RATE_LIMIT,
            granularity: Granularity::OneMinute,
            intraday_lookback: chrono::Duration::days(1),
            swing_lookback: chrono::Duration::days(365),
        }
    }

    pub fn sandbox() -> Self {
        Self {
            divisor: SANDBOX_DIVISOR,
            rate_limit: SANDBOX_RATE_LIMIT,
            ..Self::production()
        }
    }

    pub fn for_environment(sandbox: bool) -> Self {
        if sandbox {
            Self::sandbox()
        } else {
            Self::production()
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// What happened to one instrument during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Chain produced a non-void result and it was handed to the notifier.
    Signalled,
    /// Chain evaluated to void.
    NoSignal,
    /// No bars available.
    Skipped,
    /// Provider or store failure.
    Failed,
}

/// Per-pass tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub partitions: usize,
    pub signalled: usize,
    pub no_signal: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ScanReport {
    pub fn record(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::Signalled => self.signalled += 1,
            ScanOutcome::NoSignal => self.no_signal += 1,
            ScanOutcome::Skipped => self.skipped += 1,
            ScanOutcome::Failed => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &ScanReport) {
        self.partitions += other.partitions;
        self.signalled += other.signalled;
        self.no_signal += other.no_signal;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Instruments visited, whatever their outcome.
    pub fn total(&self) -> usize {
        self.signalled + self.no_signal + self.skipped + self.failed
    }

    /// Instruments whose chain actually ran.
    pub fn evaluated(&self) -> usize {
        self.signalled + self.no_signal
    }
}

#[derive(Clone)]
pub struct Scanner {
    chart: Arc<dyn ChartSource>,
    store: Arc<dyn HistoricalStore>,
    notifier: Arc<dyn Notifier>,
    config: ScannerConfig,
    metrics: Option<Arc<Metrics>>,
}

impl Scanner {
    pub fn new(
        chart: Arc<dyn ChartSource>,
        store: Arc<dyn HistoricalStore>,
        notifier: Arc<dyn Notifier>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            chart,
            store,
            notifier,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run one full pass and block until every partition worker has finished.
    pub async fn run(&self, universe: &[String], chain: &ChainSpec, mode: PeriodMode) -> ScanReport {
        let started = Instant::now();
        let partitions = partition(universe, self.config.divisor);
        let partition_count = partitions.len();

        info!(
            instruments = universe.len(),
            partitions = partition_count,
            chain = %chain.name(),
            mode = %mode,
            "Scanner: starting pass over {} instruments in {} partitions",
            universe.len(),
            partition_count
        );
        self.announce(&format!(
            "Starting {} scan of {} instruments with chain {}",
            mode,
            universe.len(),
            chain.name()
        ))
        .await;

        let mut workers = JoinSet::new();
        for (idx, instruments) in partitions.into_iter().enumerate() {
            let scanner = self.clone();
            let chain = chain.clone();
            workers.spawn(async move { scanner.scan_partition(idx, instruments, &chain, mode).await });
        }

        let mut report = ScanReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(partial) => report.merge(&partial),
                Err(e) => error!(error = %e, "Scanner: partition worker aborted"),
            }
        }
        // instruments an aborted worker never reported on
        report.failed += universe.len().saturating_sub(report.total());
        report.partitions = partition_count;

        let elapsed = started.elapsed();
        if let Some(ref metrics) = self.metrics {
            metrics.scan_pass_duration_seconds.observe(elapsed.as_secs_f64());
        }

        info!(
            signalled = report.signalled,
            no_signal = report.no_signal,
            skipped = report.skipped,
            failed = report.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Scanner: pass finished"
        );
        self.announce(&format!(
            "Finished {} scan: {} signalled, {} skipped, {} failed",
            mode, report.signalled, report.skipped, report.failed
        ))
        .await;

        report
    }

    /// Repeat [`Scanner::run`] on `schedule` until `shutdown` flips to `true`.
    /// A pass in progress always completes before the loop observes shutdown.
    pub async fn run_scheduled(
        &self,
        universe: &[String],
        chain: &ChainSpec,
        mode: PeriodMode,
        schedule: &PassSchedule,
        mut shutdown: watch::Receiver<bool>,
    ) -> Vec<ScanReport> {
        let mut reports = Vec::new();
        loop {
            if *shutdown.borrow() {
                break;
            }
            reports.push(self.run(universe, chain, mode).await);

            let delay = schedule.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Scanner: waiting for next pass");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(passes = reports.len(), "Scanner: scheduled run stopped");
        reports
    }

    async fn scan_partition(
        &self,
        idx: usize,
        instruments: Vec<String>,
        chain: &ChainSpec,
        mode: PeriodMode,
    ) -> ScanReport {
        debug!(partition = idx, instruments = instruments.len(), "Scanner: partition started");
        let mut report = ScanReport::default();

        for (position, instrument) in instruments.iter().enumerate() {
            if position > 0 && !self.config.rate_limit.is_zero() {
                tokio::time::sleep(self.config.rate_limit).await;
            }
            let outcome = self.scan_instrument(instrument, chain, mode).await;
            report.record(outcome);
        }

        debug!(partition = idx, total = report.total(), "Scanner: partition finished");
        report
    }

    /// Fetch, evaluate and notify for one instrument. Never fails; errors become log entries.
    pub async fn scan_instrument(
        &self,
        instrument: &str,
        chain: &ChainSpec,
        mode: PeriodMode,
    ) -> ScanOutcome {
        debug!(symbol = %instrument, "Processing ticker: {}", instrument);

        let window = match self.fetch_window(instrument, mode).await {
            Ok(window) => window,
            Err(e) => {
                warn!(symbol = %instrument, error = %e, "Failed retrieving data for {}", instrument);
                if let Some(ref metrics) = self.metrics {
                    metrics.provider_errors_total.inc();
                }
                return ScanOutcome::Failed;
            }
        };

        if window.is_empty() {
            debug!(symbol = %instrument, "No bars for {}, skipping", instrument);
            if let Some(ref metrics) = self.metrics {
                metrics.instruments_skipped_total.inc();
            }
            return ScanOutcome::Skipped;
        }

        if let Some(ref metrics) = self.metrics {
            metrics.instruments_scanned_total.inc();
        }

        let Some(result) = chain.evaluate(&window) else {
            return ScanOutcome::NoSignal;
        };

        if let Some(ref metrics) = self.metrics {
            metrics.signals_emitted_total.inc();
        }
        if let Err(e) = self.notifier.notify(instrument, mode, &result).await {
            warn!(symbol = %instrument, error = %e, "Failed to deliver signal for {}", instrument);
            if let Some(ref metrics) = self.metrics {
                metrics.notify_errors_total.inc();
            }
        }
        ScanOutcome::Signalled
    }

    async fn fetch_window(&self, instrument: &str, mode: PeriodMode) -> Result<Window, FetchError> {
        let now = Utc::now();
        let since = |lookback: chrono::Duration| {
            now.checked_sub_signed(lookback)
                .ok_or(FetchError::LookbackOutOfRange(lookback))
        };
        let bars = match mode {
            PeriodMode::Intraday => {
                let start = since(self.config.intraday_lookback)?;
                self.chart
                    .chart(instrument, start, None, self.config.granularity)
                    .await?
            }
            PeriodMode::Swing => {
                let start = since(self.config.swing_lookback)?;
                self.store.range(instrument, start, None).await?
            }
        };
        Ok(Window::from_bars(bars))
    }

    async fn announce(&self, message: &str) {
        if let Err(e) = self.notifier.announce(message).await {
            warn!(error = %e, "Scanner: failed to announce pass");
        }
    }
}
