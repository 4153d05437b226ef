//! Collaborators: market data providers, historical storage, ingestion and notifications.

pub mod historical;
pub mod ingest;
pub mod kucoin;
pub mod market_data;
pub mod notifier;

pub use historical::{CachedChartSource, HistoricalStore, MemoryHistoricalStore};
pub use ingest::{IngestConfig, IngestOutcome, IngestReport, Ingestor};
pub use kucoin::{KucoinDecoder, KucoinProvider};
pub use market_data::{
    ChartSource, Provider, StreamDecoder, StreamEvent, StreamSource, Subscription, SymbolSource,
};
pub use notifier::{format_signal_message, LogNotifier, Notifier, SlackNotifier};
