//! RSI (Relative Strength Index) indicator

use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{Bar, IndicatorResult, Window};

/// Calculate RSI over the last `period` price changes
///
/// RSI = 100 - (100 / (1 + RS))
/// RS = Average Gain / Average Loss
pub fn calculate_rsi(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let mut gains = Vec::new();
    let mut losses = Vec::new();

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let avg_gain: f64 = gains.iter().rev().take(period).sum::<f64>() / period as f64;
    let avg_loss: f64 = losses.iter().rev().take(period).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        // flat series has no momentum either way
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

/// Oversold readings are bullish, overbought readings bearish.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl Rsi {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            period: params.time_period,
            oversold: 30.0,
            overbought: 70.0,
        }
    }

    pub fn with_thresholds(mut self, oversold: f64, overbought: f64) -> Self {
        self.oversold = oversold;
        self.overbought = overbought;
        self
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(&IndicatorParams::default())
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &'static str {
        "RSI"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Momentum
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() {
            return IndicatorResult::none();
        }
        let Some(rsi) = calculate_rsi(window.bars(), self.period) else {
            return IndicatorResult::none();
        };

        let result = if rsi < self.oversold {
            IndicatorResult::bullish()
        } else if rsi > self.overbought {
            IndicatorResult::bearish()
        } else {
            return IndicatorResult::none();
        };
        result.with("rsi", (rsi * 100.0).round() / 100.0)
    }
}
