//! Chaikin oscillator (ADOSC)
//!
//! A zero-line cross of the oscillator right after price reverses direction.

use crate::indicators::momentum::macd::oscillator_series;
use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::indicators::volume::volume::money_flow_multiplier;
use crate::models::{Bar, IndicatorResult, Window};

/// Accumulation/distribution line.
pub fn accumulation_distribution(bars: &[Bar]) -> Vec<f64> {
    let mut running = 0.0;
    bars.iter()
        .map(|bar| {
            running += money_flow_multiplier(bar) * bar.volume;
            running
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Adosc {
    fast_period: usize,
    slow_period: usize,
}

impl Adosc {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            fast_period: params.fast_period,
            slow_period: params.slow_period,
        }
    }
}

impl Indicator for Adosc {
    fn name(&self) -> &'static str {
        "ADOSC (Chaikin Oscillator)"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Volume
    }

    fn min_periods(&self) -> usize {
        (self.slow_period + 1).max(7)
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() {
            return IndicatorResult::none();
        }

        let closes = window.closes();
        let diffs: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let n = diffs.len();
        let last_three: f64 = diffs[n - 3..].iter().sum();
        let prior_three: f64 = diffs[n - 6..n - 3].iter().sum();

        let adl = accumulation_distribution(window.bars());
        let adosc = oscillator_series(&adl, self.fast_period, self.slow_period);
        let &[.., previous, latest] = adosc.as_slice() else {
            return IndicatorResult::none();
        };

        if last_three < 0.0 && prior_three > 0.0 && previous > 0.0 && latest < 0.0 {
            return IndicatorResult::bearish().with("adosc", latest);
        }
        if last_three > 0.0 && prior_three < 0.0 && previous < 0.0 && latest > 0.0 {
            return IndicatorResult::bullish().with("adosc", latest);
        }

        IndicatorResult::none()
    }
}
