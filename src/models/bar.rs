use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// One OHLCV sample for a fixed time period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Price range of the bar (high - low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Typical price: (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Bar period used when requesting charts and subscribing to streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl Granularity {
    pub fn period(&self) -> Duration {
        match self {
            Granularity::OneMinute => Duration::minutes(1),
            Granularity::FiveMinutes => Duration::minutes(5),
            Granularity::FifteenMinutes => Duration::minutes(15),
            Granularity::OneHour => Duration::hours(1),
            Granularity::OneDay => Duration::days(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1min",
            Granularity::FiveMinutes => "5min",
            Granularity::FifteenMinutes => "15min",
            Granularity::OneHour => "1hour",
            Granularity::OneDay => "1day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1min" | "1m" => Ok(Granularity::OneMinute),
            "5min" | "5m" => Ok(Granularity::FiveMinutes),
            "15min" | "15m" => Ok(Granularity::FifteenMinutes),
            "1hour" | "1h" => Ok(Granularity::OneHour),
            "1day" | "1d" => Ok(Granularity::OneDay),
            other => Err(ConfigError::InvalidValue {
                key: "GRANULARITY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Selects where the scanner pulls its window from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMode {
    /// Current-session bars straight from the provider.
    Intraday,
    /// Multi-month window from the historical store.
    Swing,
}

impl PeriodMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodMode::Intraday => "intraday",
            PeriodMode::Swing => "swing",
        }
    }
}

impl fmt::Display for PeriodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intraday" => Ok(PeriodMode::Intraday),
            "swing" => Ok(PeriodMode::Swing),
            other => Err(ConfigError::InvalidValue {
                key: "SCAN_MODE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
