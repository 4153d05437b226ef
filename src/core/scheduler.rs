//! Cron-based pacing for repeated scan passes

use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;

/// Fixed-interval schedule expressed as a cron expression, so passes land on wall-clock
/// boundaries. Only intervals that divide the enclosing minute, hour or day evenly are
/// accepted; anything else would drift or fire unevenly.
#[derive(Debug, Clone)]
pub struct PassSchedule {
    interval_seconds: u64,
    expression: String,
    schedule: Schedule,
}

impl PassSchedule {
    /// `interval_seconds == 0` means one-shot and is rejected here; callers skip scheduling.
    pub fn new(interval_seconds: u64) -> Result<Self, ConfigError> {
        let expression = cron_expression(interval_seconds).ok_or_else(|| ConfigError::InvalidValue {
            key: "SCAN_INTERVAL_SECONDS".to_string(),
            value: interval_seconds.to_string(),
        })?;
        let schedule = Schedule::from_str(&expression).map_err(|e| ConfigError::InvalidValue {
            key: "SCAN_INTERVAL_SECONDS".to_string(),
            value: format!("{} ({}): {}", interval_seconds, expression, e),
        })?;

        info!(
            interval = interval_seconds,
            cron = %expression,
            "PassSchedule: every {}s (cron: {})",
            interval_seconds,
            expression
        );

        Ok(Self {
            interval_seconds,
            expression,
            schedule,
        })
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Time until the next tick, or the raw interval if the schedule has no upcoming tick.
    pub fn next_delay(&self) -> Duration {
        let now = Utc::now();
        match self.schedule.upcoming(Utc).next() {
            Some(next_tick) if next_tick > now => (next_tick - now).to_std().unwrap_or_default(),
            Some(_) => Duration::ZERO,
            None => Duration::from_secs(self.interval_seconds),
        }
    }
}

/// Cron format: second minute hour day month weekday.
///
/// `None` when no cron step reproduces the interval exactly: zero, a seconds/minutes/hours
/// step that does not divide its field, or anything longer than a day.
pub fn cron_expression(interval_seconds: u64) -> Option<String> {
    let divides = |unit: u64, span: u64| interval_seconds % unit == 0 && span % (interval_seconds / unit) == 0;

    match interval_seconds {
        0 => None,
        s if s < 60 && divides(1, 60) => Some(format!("*/{} * * * * *", s)),
        s if s < 3600 && divides(60, 60) => Some(format!("0 */{} * * * *", s / 60)),
        s if s < 86_400 && divides(3600, 24) => Some(format!("0 0 */{} * * *", s / 3600)),
        86_400 => Some("0 0 0 * * *".to_string()),
        _ => None,
    }
}

/// Startup check for a configured pass interval. `0` (single pass) is always valid.
pub fn validate_interval(interval_seconds: u64) -> Result<(), ConfigError> {
    if interval_seconds == 0 || cron_expression(interval_seconds).is_some() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: "SCAN_INTERVAL_SECONDS".to_string(),
            value: interval_seconds.to_string(),
        })
    }
}
