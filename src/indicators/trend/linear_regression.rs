//! Linear-regression projection of closes.

use crate::common::math;
use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{IndicatorResult, Window};

const MIN_FIT: f64 = 0.95;
const PROJECTION_PERIODS: f64 = 5.0;
const BREAKOUT_PCT: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct LinearRegression {
    min_periods: usize,
}

impl LinearRegression {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            min_periods: params.fast_period,
        }
    }
}

impl Indicator for LinearRegression {
    fn name(&self) -> &'static str {
        "Linear Regression"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Trend
    }

    fn min_periods(&self) -> usize {
        self.min_periods
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods {
            return IndicatorResult::none();
        }
        let closes = window.closes();
        let Some(fit) = math::linear_regression(&closes) else {
            return IndicatorResult::none();
        };
        if fit.r_squared <= MIN_FIT {
            return IndicatorResult::none();
        }

        let close = closes[closes.len() - 1];
        let projected = fit.predict(closes.len() as f64 - 1.0 + PROJECTION_PERIODS);
        let prediction = (projected * 100.0).round() / 100.0;

        if projected > close * (1.0 + BREAKOUT_PCT) {
            IndicatorResult::bullish().with("prediction", prediction)
        } else if projected < close * (1.0 - BREAKOUT_PCT) {
            IndicatorResult::bearish().with("prediction", prediction)
        } else {
            IndicatorResult::none()
        }
    }
}
