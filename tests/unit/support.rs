//! Shared bar builders and stub indicators for unit tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use jtrader::indicators::{Indicator, IndicatorCategory};
use jtrader::models::{Bar, IndicatorResult, SignalType, Window};

/// Minute-aligned epoch used as bar zero.
pub const BASE_EPOCH: i64 = 1_699_999_980;

pub fn ts(minute: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_EPOCH + minute * 60, 0).unwrap()
}

pub fn bar(minute: i64, close: f64) -> Bar {
    Bar::new(ts(minute), close, close + 1.0, close - 1.0, close, 100.0)
}

/// Falling closes, every bar closing on its high: oversold RSI with buying pressure.
pub fn declining_closing_high(count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = 200.0 - i as f64;
            Bar::new(ts(i as i64), close - 0.5, close, close - 1.0, close, 100.0)
        })
        .collect()
}

/// Falling closes, every bar closing on its low: oversold RSI with selling pressure.
pub fn declining_closing_low(count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = 200.0 - i as f64;
            Bar::new(ts(i as i64), close + 0.5, close + 1.0, close, close, 100.0)
        })
        .collect()
}

/// Indicator returning a fixed signal and counting evaluations.
pub struct Fixed {
    name: &'static str,
    signal: Option<SignalType>,
    calls: Arc<AtomicUsize>,
}

impl Fixed {
    pub fn new(name: &'static str, signal: Option<SignalType>) -> Self {
        Self {
            name,
            signal,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn bullish(name: &'static str) -> Box<dyn Indicator> {
        Box::new(Self::new(name, Some(SignalType::Bullish)))
    }

    pub fn bearish(name: &'static str) -> Box<dyn Indicator> {
        Box::new(Self::new(name, Some(SignalType::Bearish)))
    }

    pub fn silent(name: &'static str) -> Box<dyn Indicator> {
        Box::new(Self::new(name, None))
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Indicator for Fixed {
    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> IndicatorCategory {
        IndicatorCategory::Momentum
    }

    fn min_periods(&self) -> usize {
        0
    }

    fn evaluate(&self, _window: &Window) -> IndicatorResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        IndicatorResult::from_signal(self.signal).with("stub", self.name)
    }
}
