//! Shared data models spanning the engine layers.

pub mod bar;
pub mod signal;
pub mod window;

pub use bar::{Bar, Granularity, PeriodMode};
pub use signal::{ChainEntry, ChainResult, IndicatorResult, SignalType};
pub use window::{SlidingWindow, Window, WindowUpdate};
