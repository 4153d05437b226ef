//! Error types for each collaborator boundary.

use thiserror::Error;

/// Failures raised by a market data provider (REST or streaming).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by upstream provider")]
    RateLimited,

    #[error("upstream error {code}: {message}")]
    Upstream { code: String, message: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16()) == Some(429) {
            return ProviderError::RateLimited;
        }
        if err.is_decode() {
            return ProviderError::Decode(err.to_string());
        }
        ProviderError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ProviderError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// Failures raised by a historical bar store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("failed to decode stored bar: {0}")]
    Decode(String),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Query(err.to_string())
        }
    }
}

/// Failures delivering a notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),

    #[error("notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

/// Startup configuration errors. These are fatal and raised before any work begins.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("indicator set resolved to no indicators")]
    EmptyIndicatorSet,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Failures classifying a streaming payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("unexpected message shape: {0}")]
    UnexpectedShape(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// Failures that terminate a streaming trader.
#[derive(Error, Debug)]
pub enum TraderError {
    #[error("failed to seed window for {instrument}: {source}")]
    Seed {
        instrument: String,
        #[source]
        source: ProviderError,
    },

    #[error("window capacity {capacity} for {instrument} spans more time than can be represented")]
    CapacityOutOfRange { instrument: String, capacity: usize },

    #[error("failed to subscribe to {instrument}: {source}")]
    Subscribe {
        instrument: String,
        #[source]
        source: ProviderError,
    },
}

/// Failure fetching one instrument's window, from either collaborator.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("lookback of {0} reaches before the representable time range")]
    LookbackOutOfRange(chrono::Duration),
}
