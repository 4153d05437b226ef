//! APO (Absolute Price Oscillator)
//!
//! Bullish when price prints a lower low while the oscillator climbs above every earlier
//! reading; bearish on the mirrored higher-high divergence.

use crate::indicators::momentum::macd::oscillator_series;
use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{IndicatorResult, Window};

#[derive(Debug, Clone)]
pub struct Apo {
    fast_period: usize,
    slow_period: usize,
}

impl Apo {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            fast_period: params.fast_period,
            slow_period: params.slow_period,
        }
    }
}

impl Indicator for Apo {
    fn name(&self) -> &'static str {
        "APO"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Momentum
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.fast_period
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() {
            return IndicatorResult::none();
        }

        let apo = oscillator_series(&window.closes(), self.fast_period, self.slow_period);
        if apo.len() <= self.fast_period {
            return IndicatorResult::none();
        }
        let latest = apo[apo.len() - 1];
        let earlier = &apo[..apo.len() - self.fast_period];

        if window.has_lower_low() {
            let highest = earlier.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if latest > highest {
                return IndicatorResult::bullish().with("apo", latest);
            }
        }

        if window.has_higher_high() {
            let lowest = earlier.iter().cloned().fold(f64::INFINITY, f64::min);
            if latest < lowest {
                return IndicatorResult::bearish().with("apo", latest);
            }
        }

        IndicatorResult::none()
    }
}
