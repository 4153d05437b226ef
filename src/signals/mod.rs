//! Signal evaluation interfaces.

pub mod chain;

pub use chain::{Chain, ChainSpec, ChainStep, SignPolicy, DEFAULT_CHAIN_NAME};
