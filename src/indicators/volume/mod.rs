pub mod adosc;
pub mod obv;
#[allow(clippy::module_inception)]
pub mod volume;
pub mod vwap;

pub use adosc::Adosc;
pub use obv::{calculate_obv, Obv};
pub use volume::{money_flow_multiplier, Volume};
pub use vwap::{calculate_vwap, Vwap};
