//! KuCoin REST envelopes and WebSocket message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DecodeError, ProviderError};
use crate::models::{Bar, Granularity};
use crate::services::market_data::{StreamDecoder, StreamEvent};

pub const SUCCESS_CODE: &str = "200000";
pub const RATE_LIMIT_CODE: &str = "429000";

pub const SUBJECT_CANDLES_ADD: &str = "trade.candles.add";
pub const SUBJECT_CANDLES_UPDATE: &str = "trade.candles.update";

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> Result<T, ProviderError> {
        if self.code == RATE_LIMIT_CODE {
            return Err(ProviderError::RateLimited);
        }
        if self.code != SUCCESS_CODE {
            return Err(ProviderError::Upstream {
                code: self.code,
                message: self.msg.unwrap_or_default(),
            });
        }
        self.data
            .ok_or_else(|| ProviderError::Decode("response has no data".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default = "enabled_by_default")]
    pub enable_trading: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletToken {
    pub token: String,
    pub instance_servers: Vec<InstanceServer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceServer {
    pub endpoint: String,
    /// Milliseconds between client pings.
    #[serde(default)]
    pub ping_interval: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub topic: String,
    pub private_channel: bool,
    pub response: bool,
}

impl SubscribeRequest {
    pub fn candles(id: impl Into<String>, instrument: &str, granularity: Granularity) -> Self {
        Self {
            id: id.into(),
            kind: "subscribe",
            topic: candle_topic(instrument, granularity),
            private_channel: false,
            response: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PingRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl PingRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "ping",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CandleData {
    #[serde(default)]
    pub symbol: Option<String>,
    pub candles: Vec<String>,
}

pub fn candle_topic(instrument: &str, granularity: Granularity) -> String {
    format!("/market/candles:{}_{}", instrument, granularity.as_str())
}

/// Parse a KuCoin kline row: `[time, open, close, high, low, volume, amount]`, time in
/// epoch seconds.
pub fn parse_candle(fields: &[String]) -> Result<Bar, DecodeError> {
    if fields.len() < 6 {
        return Err(DecodeError::UnexpectedShape(format!(
            "kline row has {} fields",
            fields.len()
        )));
    }

    let number = |idx: usize| -> Result<f64, DecodeError> {
        fields[idx]
            .parse::<f64>()
            .map_err(|e| DecodeError::Malformed(format!("field {}: {}", idx, e)))
    };

    let seconds = fields[0]
        .parse::<i64>()
        .map_err(|e| DecodeError::Malformed(format!("timestamp: {}", e)))?;
    let timestamp = DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| DecodeError::Malformed(format!("timestamp out of range: {}", seconds)))?;

    let bar = Bar::new(timestamp, number(1)?, number(3)?, number(4)?, number(2)?, number(5)?);
    match fields.get(6) {
        Some(_) => Ok(bar.with_amount(number(6)?)),
        None => Ok(bar),
    }
}

/// Classifies KuCoin public stream payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct KucoinDecoder;

impl StreamDecoder for KucoinDecoder {
    fn decode(&self, payload: &str) -> Result<StreamEvent, DecodeError> {
        let envelope: StreamEnvelope = serde_json::from_str(payload)?;

        match envelope.kind.as_str() {
            "welcome" | "ack" | "pong" => Ok(StreamEvent::Confirmation),
            "error" => Err(DecodeError::UnexpectedShape(format!(
                "stream error: {}",
                envelope.data.map(|d| d.to_string()).unwrap_or_default()
            ))),
            "message" => match envelope.subject.as_deref() {
                Some(SUBJECT_CANDLES_ADD) | Some(SUBJECT_CANDLES_UPDATE) => {
                    let data = envelope
                        .data
                        .ok_or_else(|| DecodeError::UnexpectedShape("candle message without data".to_string()))?;
                    let candle: CandleData = serde_json::from_value(data)?;
                    Ok(StreamEvent::Bar(parse_candle(&candle.candles)?))
                }
                _ => Ok(StreamEvent::Ignored),
            },
            _ => Ok(StreamEvent::Ignored),
        }
    }
}
