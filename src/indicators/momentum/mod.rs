pub mod apo;
pub mod macd;
pub mod rsi;
pub mod ultosc;

pub use apo::Apo;
pub use macd::{calculate_macd, Macd, MacdValue};
pub use rsi::{calculate_rsi, Rsi};
pub use ultosc::UltimateOscillator;
