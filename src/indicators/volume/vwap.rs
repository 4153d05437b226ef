//! VWAP (Volume Weighted Average Price) band

use crate::common::math;
use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{Bar, IndicatorResult, Window};

/// Cumulative VWAP at every bar.
pub fn calculate_vwap(bars: &[Bar]) -> Vec<f64> {
    let mut price_volume = 0.0;
    let mut volume = 0.0;
    bars.iter()
        .map(|bar| {
            price_volume += bar.typical_price() * bar.volume;
            volume += bar.volume;
            if volume == 0.0 {
                bar.typical_price()
            } else {
                price_volume / volume
            }
        })
        .collect()
}

/// VWAP stretched beyond one standard deviation of its own regression line.
#[derive(Debug, Clone)]
pub struct Vwap {
    min_periods: usize,
}

impl Vwap {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            min_periods: params.time_period.max(3),
        }
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &'static str {
        "VWAP"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Volume
    }

    fn min_periods(&self) -> usize {
        self.min_periods
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods {
            return IndicatorResult::none();
        }
        let vwap = calculate_vwap(window.bars());
        let (Some(fit), Some(deviation)) = (math::linear_regression(&vwap), math::std_dev(&vwap)) else {
            return IndicatorResult::none();
        };

        let latest = vwap[vwap.len() - 1];
        let regression = fit.predict(vwap.len() as f64 - 1.0);

        if latest > regression + deviation {
            IndicatorResult::bearish().with("vwap", latest)
        } else if latest < regression - deviation {
            IndicatorResult::bullish().with("vwap", latest)
        } else {
            IndicatorResult::none()
        }
    }
}
