//! ADX (Average Directional Index) indicator

use crate::common::math;
use crate::indicators::registry::{Indicator, IndicatorCategory, IndicatorParams};
use crate::models::{Bar, IndicatorResult, Window};

/// Directional movement series, all aligned to the same trailing bars.
#[derive(Debug, Clone, Default)]
pub struct DirectionalSeries {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

pub fn calculate_directional(bars: &[Bar], period: usize) -> Option<DirectionalSeries> {
    if period == 0 || bars.len() < period * 2 + 1 {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    let mut tr = Vec::with_capacity(bars.len() - 1);

    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        let up_move = bar.high - prev.high;
        let down_move = prev.low - bar.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        tr.push(math::true_range(bar.high, bar.low, prev.close));
    }

    let tr_smooth = math::wilder_series(&tr, period);
    let plus_smooth = math::wilder_series(&plus_dm, period);
    let minus_smooth = math::wilder_series(&minus_dm, period);

    let ratio = |dm: f64, range: f64| if range == 0.0 { 0.0 } else { 100.0 * dm / range };
    let plus_di: Vec<f64> = plus_smooth.iter().zip(&tr_smooth).map(|(d, r)| ratio(*d, *r)).collect();
    let minus_di: Vec<f64> = minus_smooth.iter().zip(&tr_smooth).map(|(d, r)| ratio(*d, *r)).collect();

    let dx: Vec<f64> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(p, m)| {
            let sum = p + m;
            if sum == 0.0 {
                0.0
            } else {
                100.0 * (p - m).abs() / sum
            }
        })
        .collect();

    let adx = math::wilder_series(&dx, period);
    if adx.is_empty() {
        return None;
    }

    // DI and ADX series all end on the latest bar
    Some(DirectionalSeries {
        plus_di,
        minus_di,
        adx,
    })
}

/// Directional crossover on the latest bar with a trending ADX.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    trend_threshold: f64,
}

impl Adx {
    pub fn new(params: &IndicatorParams) -> Self {
        Self {
            period: params.time_period,
            trend_threshold: 25.0,
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &'static str {
        "ADX"
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Trend
    }

    fn min_periods(&self) -> usize {
        self.period * 2 + 1
    }

    fn evaluate(&self, window: &Window) -> IndicatorResult {
        if window.len() < self.min_periods() {
            return IndicatorResult::none();
        }
        let Some(series) = calculate_directional(window.bars(), self.period) else {
            return IndicatorResult::none();
        };
        let n = series.plus_di.len();
        if n < 2 {
            return IndicatorResult::none();
        }

        let adx = series.adx[series.adx.len() - 1];
        if adx < self.trend_threshold {
            return IndicatorResult::none();
        }

        let (plus_prev, plus_now) = (series.plus_di[n - 2], series.plus_di[n - 1]);
        let (minus_prev, minus_now) = (series.minus_di[n - 2], series.minus_di[n - 1]);
        let adx = (adx * 100.0).round() / 100.0;

        if plus_prev < minus_prev && plus_now > minus_now {
            return IndicatorResult::bullish().with("adx", adx);
        }
        if minus_prev < plus_prev && minus_now > plus_now {
            return IndicatorResult::bearish().with("adx", adx);
        }

        IndicatorResult::none()
    }
}
