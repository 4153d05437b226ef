//! Slack webhook delivery.

use jtrader::error::NotifyError;
use jtrader::models::{ChainEntry, ChainResult, PeriodMode, SignalType};
use jtrader::services::notifier::SANDBOX_CHANNEL;
use jtrader::services::{Notifier, SlackNotifier};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn result() -> ChainResult {
    ChainResult {
        chain: "oversold".to_string(),
        signal: SignalType::Bullish,
        entries: vec![ChainEntry {
            indicator: "RSI".to_string(),
            signal: SignalType::Bullish,
            metadata: Default::default(),
        }],
    }
}

#[tokio::test]
async fn sandbox_signal_posts_to_dev_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({
            "channel": SANDBOX_CHANNEL,
            "text": "AAA triggered [\"RSI\"] (intraday, BULLISH)"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = SlackNotifier::new(format!("{}/hook", server.uri()), "#alerts").sandboxed(true);
    assert_eq!(notifier.channel(), SANDBOX_CHANNEL);

    notifier
        .notify("AAA", PeriodMode::Intraday, &result())
        .await
        .unwrap();
}

#[tokio::test]
async fn announcement_uses_configured_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({
            "channel": "#alerts",
            "text": "Starting swing scan"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = SlackNotifier::new(format!("{}/hook", server.uri()), "#alerts");
    notifier.announce("Starting swing scan").await.unwrap();
}

#[tokio::test]
async fn rejected_post_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("invalid_payload"))
        .mount(&server)
        .await;

    let notifier = SlackNotifier::new(format!("{}/hook", server.uri()), "#alerts");
    let err = notifier
        .notify("AAA", PeriodMode::Swing, &result())
        .await
        .unwrap_err();

    assert!(matches!(err, NotifyError::Rejected { status: 500, ref body } if body == "invalid_payload"));
}

#[tokio::test]
async fn disabled_notifier_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = SlackNotifier::new(format!("{}/hook", server.uri()), "#alerts").enabled(false);
    notifier
        .notify("AAA", PeriodMode::Intraday, &result())
        .await
        .unwrap();
    notifier.announce("ignored").await.unwrap();
}
