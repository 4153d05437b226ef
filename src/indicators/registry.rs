//! Indicator registry and trait system

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::models::{IndicatorResult, Window};

use super::momentum::{Apo, Macd, Rsi, UltimateOscillator};
use super::trend::{Adx, LinearRegression};
use super::volume::{Adosc, Obv, Volume, Vwap};

/// Key that expands to every registered indicator.
pub const ALL_INDICATORS: &str = "all";

/// Indicator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorCategory {
    Momentum,
    Trend,
    Volume,
}

/// A stateless rule classifying a window as bullish, bearish or no signal.
///
/// Implementations must not depend on another indicator's output and must return
/// [`IndicatorResult::none`] (not panic) when the window is shorter than
/// [`Indicator::min_periods`].
pub trait Indicator: Send + Sync {
    /// Get the name of the indicator
    fn name(&self) -> &'static str;

    /// Get the category this indicator belongs to
    fn category(&self) -> IndicatorCategory;

    /// Minimum number of bars required to produce a signal.
    fn min_periods(&self) -> usize;

    fn evaluate(&self, window: &Window) -> IndicatorResult;
}

impl fmt::Debug for dyn Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indicator")
            .field("name", &self.name())
            .field("min_periods", &self.min_periods())
            .finish()
    }
}

/// Fixed per-indicator lookback and smoothing periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub time_period: usize,
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            time_period: 10,
            fast_period: 14,
            slow_period: 28,
            signal_period: 10,
        }
    }
}

pub type IndicatorConstructor = Arc<dyn Fn(&IndicatorParams) -> Box<dyn Indicator> + Send + Sync>;

/// Maps stable string keys to indicator constructors.
#[derive(Clone, Default)]
pub struct IndicatorRegistry {
    order: Vec<String>,
    constructors: HashMap<String, IndicatorConstructor>,
}

impl IndicatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in indicator library.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("apo", |p| Box::new(Apo::new(p)));
        registry.register("ultosc", |p| Box::new(UltimateOscillator::new(p)));
        registry.register("rsi", |p| Box::new(Rsi::new(p)));
        registry.register("macd", |p| Box::new(Macd::new(p)));
        registry.register("adosc", |p| Box::new(Adosc::new(p)));
        registry.register("adx", |p| Box::new(Adx::new(p)));
        registry.register("obv", |p| Box::new(Obv::new(p)));
        registry.register("lr", |p| Box::new(LinearRegression::new(p)));
        registry.register("vwap", |p| Box::new(Vwap::new(p)));
        registry.register("volume", |p| Box::new(Volume::new(p)));
        registry
    }

    /// Register (or replace) a constructor under `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, constructor: F)
    where
        F: Fn(&IndicatorParams) -> Box<dyn Indicator> + Send + Sync + 'static,
    {
        let key = key.into().to_lowercase();
        if !self.constructors.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.constructors.insert(key, Arc::new(constructor));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors.contains_key(&key.to_lowercase())
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    /// Validate and expand configured keys. `all` expands to every registered key;
    /// duplicates are dropped keeping first position.
    pub fn resolve<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<String>, ConfigError> {
        let mut resolved: Vec<String> = Vec::new();
        for key in keys {
            let key = key.as_ref().trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if key == ALL_INDICATORS {
                for k in &self.order {
                    if !resolved.contains(k) {
                        resolved.push(k.clone());
                    }
                }
                continue;
            }
            if !self.constructors.contains_key(&key) {
                return Err(ConfigError::UnknownIndicator(key));
            }
            if !resolved.contains(&key) {
                resolved.push(key);
            }
        }

        if resolved.is_empty() {
            return Err(ConfigError::EmptyIndicatorSet);
        }
        Ok(resolved)
    }

    pub fn build(&self, key: &str, params: &IndicatorParams) -> Option<Box<dyn Indicator>> {
        self.constructors
            .get(&key.to_lowercase())
            .map(|constructor| constructor(params))
    }
}

impl fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorRegistry")
            .field("keys", &self.order)
            .finish()
    }
}
