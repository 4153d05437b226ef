//! Volume-confirmed accumulation/distribution.
//!
//! Recent volume must hold up against the longer baseline; the sign of the close-location
//! weighted volume over the recent bars then decides the direction.

use crate::common::math;
use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{Bar, IndicatorResult, Window};

/// Close location value in [-1, 1]: +1 closes on the high, -1 on the low.
pub fn money_flow_multiplier(bar: &Bar) -> f64 {
    let range = bar.range();
    if range == 0.0 {
        return 0.0;
    }
    ((bar.close - bar.low) - (bar.high - bar.close)) / range
}

#[derive(Debug, Clone)]
pub struct Volume {
    recent_period: usize,
    baseline_period: usize,
    min_ratio: f64,
}

impl Volume {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            recent_period: params.fast_period,
            baseline_period: params.slow_period,
            min_ratio: 1.0,
        }
    }

    pub fn with_min_ratio(mut self, min_ratio: f64) -> Self {
        self.min_ratio = min_ratio;
        self
    }
}

impl Indicator for Volume {
    fn name(&self) -> &'static str {
        "Volume"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Volume
    }

    fn min_periods(&self) -> usize {
        self.baseline_period.max(self.recent_period)
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() || self.recent_period == 0 {
            return IndicatorResult::none();
        }

        let volumes = window.volumes();
        let (Some(recent), Some(baseline)) = (
            math::sma(&volumes, self.recent_period),
            math::sma(&volumes, self.baseline_period),
        ) else {
            return IndicatorResult::none();
        };
        if baseline <= 0.0 {
            return IndicatorResult::none();
        }

        let ratio = recent / baseline;
        if ratio < self.min_ratio {
            return IndicatorResult::none();
        }

        let accumulation: f64 = window
            .tail(self.recent_period)
            .bars()
            .iter()
            .map(|b| money_flow_multiplier(b) * b.volume)
            .sum();

        let result = if accumulation > 0.0 {
            IndicatorResult::bullish()
        } else if accumulation < 0.0 {
            IndicatorResult::bearish()
        } else {
            return IndicatorResult::none();
        };
        result
            .with("volume_ratio", (ratio * 100.0).round() / 100.0)
            .with("accumulation", accumulation)
    }
}
