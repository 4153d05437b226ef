//! Streaming trader: one fixed-capacity window per instrument, fed by a live
//! subscription and re-evaluated on every accepted update.
//!
//! `Disconnected -> Connecting -> Seeded -> Streaming -> Disconnected`. An unexpected
//! stream end re-enters `Connecting`; a requested shutdown terminates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder, Retryable};
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, TraderError};
use crate::metrics::Metrics;
use crate::models::{ChainResult, Granularity, PeriodMode, SlidingWindow, Window, WindowUpdate};
use crate::services::market_data::{ChartSource, StreamDecoder, StreamEvent, StreamSource, Subscription};
use crate::services::notifier::Notifier;
use crate::signals::ChainSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraderState {
    Disconnected,
    Connecting,
    Seeded,
    Streaming,
}

#[derive(Debug, Clone)]
pub struct TraderConfig {
    /// Fixed window size N.
    pub capacity: usize,
    pub granularity: Granularity,
    /// Attempts per seed fetch or subscribe before the trader gives up.
    pub max_attempts: usize,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    /// A stream that stayed open this long resets the reconnect delay.
    pub stable_after: Duration,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            granularity: Granularity::OneMinute,
            max_attempts: 5,
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            stable_after: Duration::from_secs(60),
        }
    }
}

impl TraderConfig {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_backoff)
            .with_max_delay(self.max_backoff)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }

    /// Delays between reconnect cycles after a stream ends on its own.
    fn reconnect_pacing(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.min_backoff)
            .with_max_delay(self.max_backoff)
            .without_max_times()
            .build()
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// What one inbound payload did to the trader.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Confirmation,
    Ignored,
    /// Not decodable; dropped without touching the window.
    Discarded,
    /// Bar older than the window's latest period.
    Stale,
    /// Window mutated and the chain re-ran.
    Evaluated {
        update: WindowUpdate,
        signal: Option<ChainResult>,
    },
}

pub struct Trader {
    instrument: String,
    chart: Arc<dyn ChartSource>,
    stream: Arc<dyn StreamSource>,
    decoder: Arc<dyn StreamDecoder>,
    notifier: Arc<dyn Notifier>,
    chain: ChainSpec,
    config: TraderConfig,
    window: SlidingWindow,
    state: TraderState,
    metrics: Option<Arc<Metrics>>,
}

impl Trader {
    pub fn new(
        instrument: impl Into<String>,
        chart: Arc<dyn ChartSource>,
        stream: Arc<dyn StreamSource>,
        decoder: Arc<dyn StreamDecoder>,
        notifier: Arc<dyn Notifier>,
        chain: ChainSpec,
        config: TraderConfig,
    ) -> Self {
        let window = SlidingWindow::new(config.capacity);
        Self {
            instrument: instrument.into(),
            chart,
            stream,
            decoder,
            notifier,
            chain,
            config,
            window,
            state: TraderState::Disconnected,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn state(&self) -> TraderState {
        self.state
    }

    pub fn window(&self) -> &Window {
        self.window.window()
    }

    /// Fetch the most recent `capacity` periods and replace the window with them.
    /// Returns the window length after seeding.
    pub async fn seed(&mut self) -> Result<usize, TraderError> {
        self.state = TraderState::Connecting;
        info!(symbol = %self.instrument, "Looking up previous data");

        let granularity = self.config.granularity;
        // one extra period so the in-progress bar does not cost a full one
        let start = i32::try_from(self.config.capacity.saturating_add(1))
            .ok()
            .and_then(|periods| granularity.period().checked_mul(periods))
            .and_then(|span| Utc::now().checked_sub_signed(span))
            .ok_or_else(|| TraderError::CapacityOutOfRange {
                instrument: self.instrument.clone(),
                capacity: self.config.capacity,
            })?;

        let chart = self.chart.clone();
        let instrument = self.instrument.clone();
        let bars = (|| async { chart.chart(&instrument, start, None, granularity).await })
            .retry(self.config.backoff())
            .notify(|e: &ProviderError, delay: Duration| {
                warn!(symbol = %instrument, error = %e, delay_ms = delay.as_millis() as u64, "Seed fetch failed, retrying");
            })
            .await
            .map_err(|source| TraderError::Seed {
                instrument: self.instrument.clone(),
                source,
            })?;

        let fetched = bars.len();
        let evicted = self.window.seed(bars);
        self.state = TraderState::Seeded;
        debug!(
            symbol = %self.instrument,
            fetched = fetched,
            evicted = evicted,
            len = self.window.len(),
            "Window seeded"
        );
        Ok(self.window.len())
    }

    async fn connect(&self) -> Result<Subscription, TraderError> {
        let stream = self.stream.clone();
        let instrument = self.instrument.clone();
        let granularity = self.config.granularity;
        (|| async { stream.subscribe(&instrument, granularity).await })
            .retry(self.config.backoff())
            .notify(|e: &ProviderError, delay: Duration| {
                warn!(symbol = %instrument, error = %e, delay_ms = delay.as_millis() as u64, "Subscribe failed, retrying");
            })
            .await
            .map_err(|source| TraderError::Subscribe {
                instrument: self.instrument.clone(),
                source,
            })
    }

    /// Classify one payload, apply it to the window and re-run the chain on mutation.
    pub async fn handle_message(&mut self, payload: &str) -> MessageOutcome {
        if let Some(ref metrics) = self.metrics {
            metrics.stream_messages_total.inc();
        }

        let event = match self.decoder.decode(payload) {
            Ok(event) => event,
            Err(e) => {
                debug!(symbol = %self.instrument, error = %e, "Discarding malformed stream message");
                if let Some(ref metrics) = self.metrics {
                    metrics.stream_messages_discarded_total.inc();
                }
                return MessageOutcome::Discarded;
            }
        };

        let bar = match event {
            StreamEvent::Confirmation => {
                debug!(symbol = %self.instrument, "Stream confirmation");
                return MessageOutcome::Confirmation;
            }
            StreamEvent::Ignored => return MessageOutcome::Ignored,
            StreamEvent::Bar(bar) => bar,
        };

        let update = self.window.apply(bar);
        if !update.is_mutation() {
            debug!(symbol = %self.instrument, "Ignoring stale bar");
            return MessageOutcome::Stale;
        }

        let signal = self.chain.evaluate(self.window.window());
        if let Some(ref result) = signal {
            if let Some(ref metrics) = self.metrics {
                metrics.signals_emitted_total.inc();
            }
            if let Err(e) = self
                .notifier
                .notify(&self.instrument, PeriodMode::Intraday, result)
                .await
            {
                warn!(symbol = %self.instrument, error = %e, "Failed to deliver signal");
                if let Some(ref metrics) = self.metrics {
                    metrics.notify_errors_total.inc();
                }
            }
        }

        MessageOutcome::Evaluated { update, signal }
    }

    async fn establish(&mut self) -> Result<Subscription, TraderError> {
        self.seed().await?;
        self.connect().await
    }

    /// Drive the state machine until `shutdown` is set or reconnection is exhausted.
    /// Shutdown is honoured while seeding, subscribing and waiting to reconnect.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), TraderError> {
        let mut pacing = self.config.reconnect_pacing();

        loop {
            let mut subscription = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                connected = self.establish() => connected?,
            };
            self.state = TraderState::Streaming;
            if let Some(ref metrics) = self.metrics {
                metrics.active_traders.inc();
            }
            info!(symbol = %self.instrument, capacity = self.window.capacity(), "Streaming");
            let opened = Instant::now();

            let requested = loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break true;
                        }
                    }
                    message = subscription.next() => match message {
                        Some(payload) => {
                            self.handle_message(&payload).await;
                        }
                        None => break false,
                    }
                }
            };

            subscription.close().await;
            self.state = TraderState::Disconnected;
            if let Some(ref metrics) = self.metrics {
                metrics.active_traders.dec();
            }

            if requested {
                break;
            }

            if opened.elapsed() >= self.config.stable_after {
                pacing = self.config.reconnect_pacing();
            }
            let delay = pacing.next().unwrap_or(self.config.max_backoff);
            warn!(
                symbol = %self.instrument,
                delay_ms = delay.as_millis() as u64,
                "Stream closed unexpectedly, reconnecting"
            );
            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(symbol = %self.instrument, "Trader stopped");
        self.state = TraderState::Disconnected;
        Ok(())
    }
}

/// Run every trader concurrently until `shutdown` is set, then wait for all of them.
pub async fn run_traders(traders: Vec<Trader>, shutdown: watch::Receiver<bool>) -> Vec<(String, Result<(), TraderError>)> {
    let mut tasks = JoinSet::new();
    for trader in traders {
        let instrument = trader.instrument().to_string();
        let shutdown = shutdown.clone();
        tasks.spawn(async move { (instrument, trader.run(shutdown).await) });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((instrument, result)) => {
                if let Err(ref e) = result {
                    error!(symbol = %instrument, error = %e, "Trader terminated");
                }
                results.push((instrument, result));
            }
            Err(e) => error!(error = %e, "Trader task aborted"),
        }
    }
    results
}
