//! jtrader: technical-indicator signal engine.
//!
//! A batch [`core::scanner::Scanner`] walks an instrument universe in concurrent
//! partitions; a streaming [`core::trader::Trader`] keeps a rolling window per instrument
//! from a live feed. Both evaluate a [`signals::Chain`] of indicators and hand non-void
//! results to a [`services::notifier::Notifier`].

pub mod common;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;
