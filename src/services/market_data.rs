//! Market data provider interfaces.
//!
//! Each capability is its own trait so an adapter implements only what it supports and
//! the scanner/trader depend on the narrowest interface they need.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{DecodeError, ProviderError};
use crate::models::{Bar, Granularity};

#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// Every tradable instrument id the provider knows about.
    async fn symbols(&self) -> Result<Vec<String>, ProviderError>;
}

#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Bars for `instrument` from `start` up to `end` (or now), in any order.
    async fn chart(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        granularity: Granularity,
    ) -> Result<Vec<Bar>, ProviderError>;
}

#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Open a live subscription delivering raw payloads for one instrument.
    async fn subscribe(
        &self,
        instrument: &str,
        granularity: Granularity,
    ) -> Result<Subscription, ProviderError>;
}

/// Adapter that offers every capability.
pub trait Provider: SymbolSource + ChartSource + StreamSource {}

impl<T: SymbolSource + ChartSource + StreamSource> Provider for T {}

/// Live per-instrument stream of raw payloads.
///
/// The stream ends (`next` returns `None`) when the transport closes or fails.
/// `close` asks the transport task to stop and waits for it.
#[derive(Debug)]
pub struct Subscription {
    instrument: String,
    messages: mpsc::Receiver<String>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(
        instrument: impl Into<String>,
        messages: mpsc::Receiver<String>,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            messages,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// Subscription backed only by a channel, with no transport task of its own.
    pub fn from_channel(instrument: impl Into<String>, messages: mpsc::Receiver<String>) -> Self {
        Self {
            instrument: instrument.into(),
            messages,
            shutdown: None,
            task: None,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub async fn next(&mut self) -> Option<String> {
        self.messages.recv().await
    }

    pub async fn close(mut self) {
        self.messages.close();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!(symbol = %self.instrument, error = %e, "Stream task ended abnormally");
                }
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Classification of one raw stream payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Handshake, subscription ack or heartbeat.
    Confirmation,
    Bar(Bar),
    /// Well-formed but irrelevant to the window.
    Ignored,
}

pub trait StreamDecoder: Send + Sync {
    fn decode(&self, payload: &str) -> Result<StreamEvent, DecodeError>;
}
