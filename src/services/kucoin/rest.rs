//! KuCoin public REST endpoints: symbol list and klines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::messages::{parse_candle, ApiResponse, BulletToken, SymbolInfo};
use super::KucoinProvider;
use crate::error::ProviderError;
use crate::models::{Bar, Granularity};
use crate::services::market_data::{ChartSource, SymbolSource};

/// KuCoin caps one kline response at this many rows.
pub const MAX_CANDLES_PER_PAGE: usize = 1500;

impl KucoinProvider {
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).timeout(self.timeout).send().await?;
        Self::decode(response).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).timeout(self.timeout).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                code: status.as_u16().to_string(),
                message: body,
            });
        }
        let envelope: ApiResponse<T> = response.json().await?;
        envelope.into_data()
    }

    pub(crate) async fn bullet_public(&self) -> Result<BulletToken, ProviderError> {
        self.post("/api/v1/bullet-public").await
    }
}

#[async_trait]
impl SymbolSource for KucoinProvider {
    async fn symbols(&self) -> Result<Vec<String>, ProviderError> {
        let symbols: Vec<SymbolInfo> = self.get("/api/v2/symbols", &[]).await?;
        Ok(symbols
            .into_iter()
            .filter(|s| s.enable_trading)
            .map(|s| s.symbol)
            .collect())
    }
}

#[async_trait]
impl ChartSource for KucoinProvider {
    /// Pages backwards from `end` until `start` is reached or a short page comes back.
    async fn chart(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        granularity: Granularity,
    ) -> Result<Vec<Bar>, ProviderError> {
        let start_at = start.timestamp();
        let mut end_at = end.unwrap_or_else(Utc::now).timestamp();
        let mut bars: Vec<Bar> = Vec::new();

        while end_at > start_at {
            let query = [
                ("symbol", instrument.to_string()),
                ("type", granularity.as_str().to_string()),
                ("startAt", start_at.to_string()),
                ("endAt", end_at.to_string()),
            ];
            let rows: Vec<Vec<String>> = self.get("/api/v1/market/candles", &query).await?;
            let page_len = rows.len();

            let mut oldest = end_at;
            for row in rows {
                let bar = parse_candle(&row).map_err(|e| ProviderError::Decode(e.to_string()))?;
                oldest = oldest.min(bar.timestamp.timestamp());
                bars.push(bar);
            }

            debug!(symbol = %instrument, rows = page_len, "Fetched kline page");
            if page_len < MAX_CANDLES_PER_PAGE || oldest >= end_at {
                break;
            }
            end_at = oldest - 1;
        }

        // newest-first from the exchange
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
