//! Core engines: batch scanner, streaming trader, pass scheduling and the HTTP surface

pub mod http;
pub mod scanner;
pub mod scheduler;
pub mod trader;

pub use http::{create_router, start_server, AppState};
pub use scanner::{partition, ScanOutcome, ScanReport, Scanner, ScannerConfig};
pub use scheduler::PassSchedule;
pub use trader::{run_traders, MessageOutcome, Trader, TraderConfig, TraderState};
