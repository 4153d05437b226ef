//! MACD (Moving Average Convergence Divergence) indicator

use crate::common::math;
use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{IndicatorResult, Window};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Difference of the fast and slow EMA, aligned to the slow series.
pub fn oscillator_series(closes: &[f64], fast_period: usize, slow_period: usize) -> Vec<f64> {
    let fast = math::ema_series(closes, fast_period);
    let slow = math::ema_series(closes, slow_period);
    if fast.is_empty() || slow.is_empty() || fast_period > slow_period {
        return Vec::new();
    }
    let offset = slow_period - fast_period;
    slow.iter()
        .enumerate()
        .map(|(i, s)| fast[i + offset] - s)
        .collect()
}

/// Calculate MACD indicator
///
/// MACD = EMA(fast) - EMA(slow)
/// Signal = EMA(signal) of MACD
/// Histogram = MACD - Signal
pub fn calculate_macd(
    closes: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Option<MacdValue> {
    let macd_values = oscillator_series(closes, fast_period, slow_period);
    if macd_values.len() < signal_period {
        return None;
    }

    let macd = *macd_values.last()?;
    let signal = math::ema(&macd_values, signal_period)?;

    Some(MacdValue {
        macd,
        signal,
        histogram: macd - signal,
    })
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            fast_period: params.fast_period,
            slow_period: params.slow_period,
            signal_period: params.signal_period,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &'static str {
        "MACD"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Momentum
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() {
            return IndicatorResult::none();
        }
        let closes = window.closes();
        let Some(value) = calculate_macd(&closes, self.fast_period, self.slow_period, self.signal_period) else {
            return IndicatorResult::none();
        };

        let result = if value.macd > value.signal {
            IndicatorResult::bullish()
        } else if value.macd < value.signal {
            IndicatorResult::bearish()
        } else {
            return IndicatorResult::none();
        };
        result
            .with("macd", value.macd)
            .with("signal", value.signal)
            .with("histogram", value.histogram)
    }
}
