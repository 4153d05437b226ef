//! KuCoin market data adapter (public REST and WebSocket).

pub mod messages;
pub mod rest;
pub mod stream;

use std::time::Duration;

pub use messages::{candle_topic, parse_candle, KucoinDecoder};

pub const DEFAULT_BASE_URL: &str = "https://api.kucoin.com";
/// Upper bound on any single REST call or WebSocket handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct KucoinProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl KucoinProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for KucoinProvider {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
