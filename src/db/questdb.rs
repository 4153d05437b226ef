//! QuestDB-backed historical bar store (PostgreSQL wire protocol)

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

use crate::config;
use crate::error::StoreError;
use crate::models::Bar;
use crate::services::historical::HistoricalStore;

const SELECT_COLUMNS: &str = "timestamp, open, high, low, close, volume, amount";

pub struct QuestDatabase {
    client: Arc<RwLock<Option<Client>>>,
}

impl QuestDatabase {
    /// Connect using `QUESTDB_URL`.
    pub async fn new() -> Result<Self, StoreError> {
        Self::connect(&config::get_questdb_url()).await
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to QuestDB: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "QuestDB connection error");
            }
        });

        let db = Self {
            client: Arc::new(RwLock::new(Some(client))),
        };
        db.init_schema().await?;
        info!("QuestDB connected");
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;

        // QuestDB syntax: designated TIMESTAMP first, PARTITION BY after
        c.execute(
            "CREATE TABLE IF NOT EXISTS bars (
                timestamp TIMESTAMP,
                symbol SYMBOL,
                open DOUBLE,
                high DOUBLE,
                low DOUBLE,
                close DOUBLE,
                volume DOUBLE,
                amount DOUBLE
            ) TIMESTAMP(timestamp) PARTITION BY DAY",
            &[],
        )
        .await?;
        Ok(())
    }

    async fn existing_timestamps(
        &self,
        client: &Client,
        instrument: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HashSet<NaiveDateTime>, StoreError> {
        let rows = client
            .query(
                "SELECT timestamp FROM bars WHERE symbol = $1 AND timestamp >= $2 AND timestamp <= $3",
                &[&instrument, &start, &end],
            )
            .await?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, NaiveDateTime>(0)
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .collect()
    }
}

fn not_connected() -> StoreError {
    StoreError::Connection("QuestDB client not connected".to_string())
}

fn bar_from_row(row: &Row) -> Result<Bar, StoreError> {
    let decode = |e: tokio_postgres::Error| StoreError::Decode(e.to_string());
    let timestamp: NaiveDateTime = row.try_get(0).map_err(decode)?;
    let bar = Bar::new(
        DateTime::<Utc>::from_naive_utc_and_offset(timestamp, Utc),
        row.try_get(1).map_err(decode)?,
        row.try_get(2).map_err(decode)?,
        row.try_get(3).map_err(decode)?,
        row.try_get(4).map_err(decode)?,
        row.try_get(5).map_err(decode)?,
    );
    let amount: Option<f64> = row.try_get(6).map_err(decode)?;
    Ok(match amount {
        Some(amount) => bar.with_amount(amount),
        None => bar,
    })
}

#[async_trait]
impl HistoricalStore for QuestDatabase {
    async fn range(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, StoreError> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;
        let start = start.naive_utc();

        let rows = match end {
            Some(end) => {
                let query = format!(
                    "SELECT {} FROM bars WHERE symbol = $1 AND timestamp >= $2 AND timestamp <= $3 ORDER BY timestamp ASC",
                    SELECT_COLUMNS
                );
                c.query(&query, &[&instrument, &start, &end.naive_utc()]).await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM bars WHERE symbol = $1 AND timestamp >= $2 ORDER BY timestamp ASC",
                    SELECT_COLUMNS
                );
                c.query(&query, &[&instrument, &start]).await?
            }
        };

        rows.iter().map(bar_from_row).collect()
    }

    async fn latest(&self, instrument: &str) -> Result<Option<Bar>, StoreError> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;
        let query = format!(
            "SELECT {} FROM bars WHERE symbol = $1 ORDER BY timestamp DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let rows = c.query(&query, &[&instrument]).await?;
        rows.first().map(bar_from_row).transpose()
    }

    async fn write_batch(&self, instrument: &str, bars: &[Bar]) -> Result<usize, StoreError> {
        let (Some(first), Some(last)) = (
            bars.iter().map(|b| b.timestamp).min(),
            bars.iter().map(|b| b.timestamp).max(),
        ) else {
            return Ok(0);
        };

        let client = self.client.read().await;
        let c = client.as_ref().ok_or_else(not_connected)?;
        let existing = self
            .existing_timestamps(c, instrument, first.naive_utc(), last.naive_utc())
            .await?;

        let statement = c
            .prepare(
                "INSERT INTO bars (timestamp, symbol, open, high, low, close, volume, amount)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .await?;

        let mut seen = existing;
        let mut written = 0;
        for bar in bars {
            let timestamp = bar.timestamp.naive_utc();
            if !seen.insert(timestamp) {
                continue;
            }
            c.execute(
                &statement,
                &[
                    &timestamp,
                    &instrument,
                    &bar.open,
                    &bar.high,
                    &bar.low,
                    &bar.close,
                    &bar.volume,
                    &bar.amount,
                ],
            )
            .await?;
            written += 1;
        }

        debug!(symbol = %instrument, written = written, "Stored bar batch");
        Ok(written)
    }
}
