//! Historical bar store interface, an in-memory store, and a store-backed chart cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{ProviderError, StoreError};
use crate::models::{Bar, Granularity};
use crate::services::market_data::ChartSource;

#[async_trait]
pub trait HistoricalStore: Send + Sync {
    /// Stored bars for `instrument` with `start <= timestamp <= end`, oldest first.
    async fn range(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, StoreError>;

    async fn latest(&self, instrument: &str) -> Result<Option<Bar>, StoreError>;

    /// Insert bars whose timestamps are not stored yet. Returns how many were written.
    async fn write_batch(&self, instrument: &str, bars: &[Bar]) -> Result<usize, StoreError>;
}

/// Process-local store keyed by instrument then timestamp.
#[derive(Debug, Default)]
pub struct MemoryHistoricalStore {
    bars: RwLock<HashMap<String, BTreeMap<DateTime<Utc>, Bar>>>,
}

impl MemoryHistoricalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, instrument: &str) -> usize {
        self.bars
            .read()
            .await
            .get(instrument)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl HistoricalStore for MemoryHistoricalStore {
    async fn range(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, StoreError> {
        let guard = self.bars.read().await;
        let Some(series) = guard.get(instrument) else {
            return Ok(Vec::new());
        };
        let bars = match end {
            Some(end) if end < start => Vec::new(),
            Some(end) => series.range(start..=end).map(|(_, b)| b.clone()).collect(),
            None => series.range(start..).map(|(_, b)| b.clone()).collect(),
        };
        Ok(bars)
    }

    async fn latest(&self, instrument: &str) -> Result<Option<Bar>, StoreError> {
        let guard = self.bars.read().await;
        Ok(guard
            .get(instrument)
            .and_then(|series| series.values().next_back().cloned()))
    }

    async fn write_batch(&self, instrument: &str, bars: &[Bar]) -> Result<usize, StoreError> {
        let mut guard = self.bars.write().await;
        let series = guard.entry(instrument.to_string()).or_default();
        let mut written = 0;
        for bar in bars {
            if !series.contains_key(&bar.timestamp) {
                series.insert(bar.timestamp, bar.clone());
                written += 1;
            }
        }
        Ok(written)
    }
}

/// Chart source that answers from the store when it already covers the requested range,
/// otherwise asks the provider and writes the result through.
///
/// A store holds a single bar granularity per instrument. Requests at any other
/// granularity go straight to the provider and are never written through.
pub struct CachedChartSource {
    source: Arc<dyn ChartSource>,
    store: Arc<dyn HistoricalStore>,
    stored_granularity: Granularity,
}

impl CachedChartSource {
    pub fn new(
        source: Arc<dyn ChartSource>,
        store: Arc<dyn HistoricalStore>,
        stored_granularity: Granularity,
    ) -> Self {
        Self {
            source,
            store,
            stored_granularity,
        }
    }
}

#[async_trait]
impl ChartSource for CachedChartSource {
    async fn chart(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        granularity: Granularity,
    ) -> Result<Vec<Bar>, ProviderError> {
        if granularity != self.stored_granularity {
            debug!(symbol = %instrument, requested = ?granularity, stored = ?self.stored_granularity, "Granularity not cached");
            return self.source.chart(instrument, start, end, granularity).await;
        }

        let period = granularity.period();
        let horizon = end.unwrap_or_else(Utc::now);

        match self.store.range(instrument, start, end).await {
            Ok(cached) => {
                let covers_start = cached.first().is_some_and(|b| b.timestamp <= start + period);
                let covers_end = cached.last().is_some_and(|b| b.timestamp + period >= horizon - period);
                if covers_start && covers_end {
                    debug!(symbol = %instrument, bars = cached.len(), "Serving chart from store");
                    return Ok(cached);
                }
            }
            Err(e) => {
                warn!(symbol = %instrument, error = %e, "Store read failed, falling back to provider");
            }
        }

        let bars = self.source.chart(instrument, start, end, granularity).await?;
        if let Err(e) = self.store.write_batch(instrument, &bars).await {
            warn!(symbol = %instrument, error = %e, "Failed to write provider bars through to store");
        }
        Ok(bars)
    }
}
