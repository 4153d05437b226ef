use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Direction of a signal. Absence of a value (`Option::None`) means "no signal".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Bullish,
    Bearish,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Bullish => "BULLISH",
            SignalType::Bearish => "BEARISH",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one indicator evaluation against a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub signal: Option<SignalType>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl IndicatorResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bullish() -> Self {
        Self::from_signal(Some(SignalType::Bullish))
    }

    pub fn bearish() -> Self {
        Self::from_signal(Some(SignalType::Bearish))
    }

    pub fn from_signal(signal: Option<SignalType>) -> Self {
        Self {
            signal,
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry for downstream logging.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_signal(&self) -> bool {
        self.signal.is_some()
    }
}

/// One passed chain step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub indicator: String,
    pub signal: SignalType,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// A fully satisfied chain evaluation. Void chains produce no result at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResult {
    pub chain: String,
    pub signal: SignalType,
    pub entries: Vec<ChainEntry>,
}

impl ChainResult {
    pub fn indicator_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.indicator.as_str()).collect()
    }
}
