use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{Bar, IndicatorResult, Window};

/// Ultimate oscillator series using periods `p`, `2p`, `3p`.
pub fn ultimate_oscillator_series(bars: &[Bar], period: usize) -> Vec<f64> {
    let longest = period * 3;
    if period == 0 || bars.len() <= longest {
        return Vec::new();
    }

    let mut buying_pressure = Vec::with_capacity(bars.len() - 1);
    let mut true_range = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        let true_low = bar.low.min(prev.close);
        let true_high = bar.high.max(prev.close);
        buying_pressure.push(bar.close - true_low);
        true_range.push(true_high - true_low);
    }

    let average = |end: usize, len: usize| -> f64 {
        let bp: f64 = buying_pressure[end - len..end].iter().sum();
        let tr: f64 = true_range[end - len..end].iter().sum();
        if tr == 0.0 {
            0.0
        } else {
            bp / tr
        }
    };

    (longest..=buying_pressure.len())
        .map(|end| {
            let short = average(end, period);
            let medium = average(end, period * 2);
            let long = average(end, longest);
            100.0 * (4.0 * short + 2.0 * medium + long) / 7.0
        })
        .collect()
}

/// Ultimate oscillator breakout confirming a price extreme.
#[derive(Debug, Clone)]
pub struct UltimateOscillator {
    period: usize,
}

impl UltimateOscillator {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            period: params.time_period,
        }
    }
}

impl Indicator for UltimateOscillator {
    fn name(&self) -> &'static str {
        "ULTOSC"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Momentum
    }

    fn min_periods(&self) -> usize {
        self.period * 3 + 2
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() {
            return IndicatorResult::none();
        }

        let series = ultimate_oscillator_series(window.bars(), self.period);
        let Some((&latest, prior)) = series.split_last() else {
            return IndicatorResult::none();
        };
        if prior.is_empty() {
            return IndicatorResult::none();
        }

        if window.has_lower_low() {
            let highest = prior.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if latest > highest {
                return IndicatorResult::bullish().with("value", latest);
            }
        } else if window.has_higher_high() {
            let lowest = prior.iter().cloned().fold(f64::INFINITY, f64::min);
            if latest < lowest {
                return IndicatorResult::bearish().with("value", latest);
            }
        }

        IndicatorResult::none()
    }
}
