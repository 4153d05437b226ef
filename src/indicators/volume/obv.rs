//! OBV (On-Balance Volume) divergence

use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{Bar, IndicatorResult, Window};

pub fn calculate_obv(bars: &[Bar]) -> Vec<f64> {
    let mut obv = Vec::with_capacity(bars.len());
    let mut running = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev = bars[i - 1].close;
            if bar.close > prev {
                running += bar.volume;
            } else if bar.close < prev {
                running -= bar.volume;
            }
        }
        obv.push(running);
    }
    obv
}

fn latest_below_prior(series: &[f64]) -> bool {
    match series.split_last() {
        Some((latest, prior)) if !prior.is_empty() => {
            *latest < prior.iter().cloned().fold(f64::INFINITY, f64::min)
        }
        _ => false,
    }
}

fn latest_above_prior(series: &[f64]) -> bool {
    match series.split_last() {
        Some((latest, prior)) if !prior.is_empty() => {
            *latest > prior.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        }
        _ => false,
    }
}

/// Price makes a new extreme that volume does not confirm.
#[derive(Debug, Clone)]
pub struct Obv {
    period: usize,
}

impl Obv {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            period: params.time_period.max(2),
        }
    }
}

impl Indicator for Obv {
    fn name(&self) -> &'static str {
        "OBV"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Volume
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() {
            return IndicatorResult::none();
        }
        let recent = window.tail(self.period);
        let obv = calculate_obv(recent.bars());
        let latest = obv.last().copied().unwrap_or_default();

        if recent.has_lower_low() && !latest_below_prior(&obv) {
            return IndicatorResult::bullish().with("obv", latest);
        }
        if recent.has_higher_high() && !latest_above_prior(&obv) {
            return IndicatorResult::bearish().with("obv", latest);
        }

        IndicatorResult::none()
    }
}
