//! Environment-driven configuration.
//!
//! Binaries call `dotenvy::dotenv()` first, then [`AppConfig::from_env`]. Every invalid
//! value is a [`ConfigError`] raised before any scanning or streaming starts.

use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::core::scanner::{ScannerConfig, PRODUCTION_DIVISOR, SANDBOX_DIVISOR};
use crate::core::scheduler::validate_interval;
use crate::error::ConfigError;
use crate::models::{Granularity, PeriodMode};
use crate::services::kucoin::DEFAULT_BASE_URL;
use crate::services::notifier::{LogNotifier, Notifier, SlackNotifier, DEFAULT_CHANNEL, SANDBOX_CHANNEL};
use crate::signals::{SignPolicy, DEFAULT_CHAIN_NAME};

pub const MAX_SWING_LOOKBACK_DAYS: i64 = 3650;
pub const MAX_TRADER_CAPACITY: usize = 10_000;

/// `APP_ENV`, defaulting to `sandbox`.
pub fn get_environment() -> String {
    env::var("APP_ENV")
        .unwrap_or_else(|_| "sandbox".to_string())
        .to_lowercase()
}

pub fn is_production() -> bool {
    matches!(get_environment().as_str(), "production" | "prod")
}

pub fn get_questdb_url() -> String {
    env::var("QUESTDB_URL").unwrap_or_else(|_| {
        "host=localhost port=8812 user=admin password=quest dbname=qdb".to_string()
    })
}

/// Where the scan universe comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Universe {
    /// The provider's live symbol list.
    Provider,
    /// A fixed list of instrument ids.
    Symbols(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sandbox: bool,
    pub universe: Universe,
    pub indicators: Vec<String>,
    pub chain_name: String,
    pub sign_policy: SignPolicy,
    pub mode: PeriodMode,
    pub divisor: usize,
    pub rate_limit: Duration,
    /// 0 means a single pass.
    pub scan_interval_seconds: u64,
    pub swing_lookback_days: i64,
    pub trader_capacity: usize,
    pub granularity: Granularity,
    pub slack_webhook_url: Option<String>,
    pub slack_channel: String,
    pub notifications_enabled: bool,
    pub http_port: Option<u16>,
    pub kucoin_api_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Used by `from_env` and by tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = get("APP_ENV").unwrap_or_else(|| "sandbox".to_string()).to_lowercase();
        let sandbox = !matches!(environment.as_str(), "production" | "prod");
        let defaults = ScannerConfig::for_environment(sandbox);

        let symbols = get("SYMBOLS").map(|list| split_list(&list));
        let universe = match get("UNIVERSE").map(|v| v.to_lowercase()).as_deref() {
            Some("provider") => Universe::Provider,
            Some("symbols") => Universe::Symbols(symbols.unwrap_or_default()),
            None => symbols.map(Universe::Symbols).unwrap_or(Universe::Provider),
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "UNIVERSE".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let indicators = split_list(&get("INDICATORS").unwrap_or_else(|| "all".to_string()));
        let sign_policy = get("CHAIN_SIGN_POLICY")
            .map(|v| v.parse::<SignPolicy>())
            .transpose()?
            .unwrap_or_default();
        let mode = get("SCAN_MODE")
            .map(|v| v.parse::<PeriodMode>())
            .transpose()?
            .unwrap_or(PeriodMode::Intraday);
        let granularity = get("GRANULARITY")
            .map(|v| v.parse::<Granularity>())
            .transpose()?
            .unwrap_or(Granularity::OneMinute);

        let divisor: usize = parse_or(&get, "PARTITION_DIVISOR", if sandbox { SANDBOX_DIVISOR } else { PRODUCTION_DIVISOR })?;
        if divisor == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PARTITION_DIVISOR".to_string(),
                value: "0".to_string(),
            });
        }
        let rate_limit_ms: u64 = parse_or(&get, "RATE_LIMIT_MS", defaults.rate_limit.as_millis() as u64)?;

        let scan_interval_seconds: u64 = parse_or(&get, "SCAN_INTERVAL_SECONDS", 3600)?;
        validate_interval(scan_interval_seconds)?;
        let swing_lookback_days = parse_within(&get, "SWING_LOOKBACK_DAYS", 365, 1..=MAX_SWING_LOOKBACK_DAYS)?;
        let trader_capacity = parse_within(&get, "TRADER_CAPACITY", 100, 1..=MAX_TRADER_CAPACITY)?;

        let slack_channel = if sandbox {
            SANDBOX_CHANNEL.to_string()
        } else {
            get("SLACK_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string())
        };

        Ok(Self {
            sandbox,
            universe,
            indicators,
            chain_name: get("CHAIN_NAME").unwrap_or_else(|| DEFAULT_CHAIN_NAME.to_string()),
            sign_policy,
            mode,
            divisor,
            rate_limit: Duration::from_millis(rate_limit_ms),
            scan_interval_seconds,
            swing_lookback_days,
            trader_capacity,
            granularity,
            slack_webhook_url: get("SLACK_WEBHOOK_URL"),
            slack_channel,
            notifications_enabled: !get("NO_NOTIFICATIONS")
                .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")),
            http_port: get("HTTP_PORT")
                .map(|v| parse_value::<u16>("HTTP_PORT", &v))
                .transpose()?,
            kucoin_api_url: get("KUCOIN_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            divisor: self.divisor,
            rate_limit: self.rate_limit,
            granularity: self.granularity,
            swing_lookback: chrono::Duration::days(self.swing_lookback_days),
            ..ScannerConfig::for_environment(self.sandbox)
        }
    }

    /// Slack when a webhook is configured, otherwise the log.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        match self.slack_webhook_url {
            Some(ref url) => Arc::new(
                SlackNotifier::new(url.clone(), self.slack_channel.clone())
                    .sandboxed(self.sandbox)
                    .enabled(self.notifications_enabled),
            ),
            None => Arc::new(LogNotifier),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_within<T, G>(get: &G, key: &str, default: T, bounds: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Display,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    if bounds.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
