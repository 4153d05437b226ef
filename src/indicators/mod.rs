//! Technical indicator library.

pub mod registry;

pub mod momentum;
pub mod trend;
pub mod volume;

pub use registry::*;
