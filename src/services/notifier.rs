//! Signal delivery to external channels.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::error::NotifyError;
use crate::models::{ChainResult, PeriodMode};

pub const DEFAULT_CHANNEL: &str = "#stock-scanner";
pub const SANDBOX_CHANNEL: &str = "#stock-scanner-dev";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one non-void chain result for `instrument`.
    async fn notify(
        &self,
        instrument: &str,
        mode: PeriodMode,
        result: &ChainResult,
    ) -> Result<(), NotifyError>;

    /// Free-form operational message (scan pass start/finish).
    async fn announce(&self, message: &str) -> Result<(), NotifyError>;
}

/// `AAA triggered ["RSI","Volume"] (intraday, BULLISH)`
pub fn format_signal_message(instrument: &str, mode: PeriodMode, result: &ChainResult) -> String {
    let names = serde_json::to_string(&result.indicator_names()).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{} triggered {} ({}, {})",
        instrument, names, mode, result.signal
    )
}

/// Writes every signal to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        instrument: &str,
        mode: PeriodMode,
        result: &ChainResult,
    ) -> Result<(), NotifyError> {
        info!(
            symbol = %instrument,
            mode = %mode,
            chain = %result.chain,
            signal = %result.signal,
            "{}",
            format_signal_message(instrument, mode, result)
        );
        Ok(())
    }

    async fn announce(&self, message: &str) -> Result<(), NotifyError> {
        info!("{}", message);
        Ok(())
    }
}

/// Posts to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
    channel: String,
    enabled: bool,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), webhook_url, channel)
    }

    pub fn with_client(
        client: reqwest::Client,
        webhook_url: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
            channel: channel.into(),
            enabled: true,
        }
    }

    /// Sandbox runs always post to the dev channel.
    pub fn sandboxed(mut self, sandbox: bool) -> Self {
        if sandbox {
            self.channel = SANDBOX_CHANNEL.to_string();
        }
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    async fn post(&self, text: &str) -> Result<(), NotifyError> {
        if !self.enabled {
            debug!(channel = %self.channel, "Notifications disabled, dropping message");
            return Ok(());
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "channel": self.channel, "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(
        &self,
        instrument: &str,
        mode: PeriodMode,
        result: &ChainResult,
    ) -> Result<(), NotifyError> {
        let message = format_signal_message(instrument, mode, result);
        info!(symbol = %instrument, channel = %self.channel, "{}", message);
        self.post(&message).await
    }

    async fn announce(&self, message: &str) -> Result<(), NotifyError> {
        self.post(message).await
    }
}
