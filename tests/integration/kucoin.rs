//! KuCoin adapter against a mocked REST API and a local WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jtrader::error::ProviderError;
use jtrader::models::Granularity;
use jtrader::services::{ChartSource, KucoinProvider, StreamSource, SymbolSource};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn provider() -> (MockServer, KucoinProvider) {
    let server = MockServer::start().await;
    let provider = KucoinProvider::with_client(format!("{}/", server.uri()), reqwest::Client::new());
    (server, provider)
}

#[tokio::test]
async fn symbols_skip_disabled_markets() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/symbols"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200000",
            "data": [
                {"symbol": "BTC-USDT", "enableTrading": true},
                {"symbol": "OLD-USDT", "enableTrading": false},
                {"symbol": "ETH-USDT"}
            ]
        })))
        .mount(&server)
        .await;

    let symbols = provider.symbols().await.unwrap();

    assert_eq!(symbols, vec!["BTC-USDT", "ETH-USDT"]);
}

#[tokio::test]
async fn chart_returns_bars_oldest_first() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/market/candles"))
        .and(query_param("symbol", "BTC-USDT"))
        .and(query_param("type", "1min"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200000",
            "data": [
                ["1700000120", "102", "103", "104", "101", "3", "309"],
                ["1700000060", "101", "102", "103", "100", "2", "204"],
                ["1700000000", "100", "101", "102", "99", "1", "101"]
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let start = chrono::DateTime::from_timestamp(1_699_999_000, 0).unwrap();
    let end = chrono::DateTime::from_timestamp(1_700_000_200, 0).unwrap();
    let bars = provider
        .chart("BTC-USDT", start, Some(end), Granularity::OneMinute)
        .await
        .unwrap();

    assert_eq!(bars.len(), 3);
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp()).collect();
    assert_eq!(timestamps, vec![1_700_000_000, 1_700_000_060, 1_700_000_120]);
    assert_eq!(bars[0].open, 100.0);
    assert_eq!(bars[0].close, 101.0);
    assert_eq!(bars[0].high, 102.0);
    assert_eq!(bars[0].low, 99.0);
    assert_eq!(bars[2].volume, 3.0);
}

#[tokio::test]
async fn envelope_error_code_is_upstream_error() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/market/candles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "400100",
            "msg": "This pair is not provided at present"
        })))
        .mount(&server)
        .await;

    let err = provider
        .chart("NOPE-USDT", chrono::Utc::now() - chrono::Duration::hours(1), None, Granularity::OneMinute)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Upstream { ref code, .. } if code == "400100"));
}

#[tokio::test]
async fn http_429_is_rate_limited() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/symbols"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    assert!(matches!(provider.symbols().await, Err(ProviderError::RateLimited)));
}

#[tokio::test]
async fn subscribe_negotiates_token_and_forwards_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (subscribed_tx, subscribed_rx) = oneshot::channel::<Value>();

    let ws_server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        ws.send(Message::Text(r#"{"id":"w","type":"welcome"}"#.to_string()))
            .await
            .unwrap();

        let request = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break serde_json::from_str::<Value>(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        };
        let id = request["id"].as_str().unwrap_or_default().to_string();
        subscribed_tx.send(request).unwrap();

        ws.send(Message::Text(json!({"id": id, "type": "ack"}).to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(
            json!({
                "type": "message",
                "topic": "/market/candles:BTC-USDT_1min",
                "subject": "trade.candles.update",
                "data": {
                    "symbol": "BTC-USDT",
                    "candles": ["1700000040", "1", "2", "3", "0.5", "10", "20"]
                }
            })
            .to_string(),
        ))
        .await
        .unwrap();

        // hold the connection until the client closes it
        while let Some(Ok(frame)) = ws.next().await {
            if frame.is_close() {
                break;
            }
        }
    });

    let (server, provider) = provider().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bullet-public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200000",
            "data": {
                "token": "public-token",
                "instanceServers": [{
                    "endpoint": format!("ws://127.0.0.1:{}", port),
                    "encrypt": false,
                    "protocol": "websocket",
                    "pingInterval": 50000,
                    "pingTimeout": 10000
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut subscription = provider
        .subscribe("BTC-USDT", Granularity::OneMinute)
        .await
        .unwrap();
    assert_eq!(subscription.instrument(), "BTC-USDT");

    let request = subscribed_rx.await.unwrap();
    assert_eq!(request["type"], "subscribe");
    assert_eq!(request["topic"], "/market/candles:BTC-USDT_1min");
    assert_eq!(request["privateChannel"], false);
    assert_eq!(request["response"], true);

    let welcome = subscription.next().await.unwrap();
    assert!(welcome.contains("welcome"));
    let ack = subscription.next().await.unwrap();
    assert!(ack.contains("ack"));
    let candle = subscription.next().await.unwrap();
    assert!(candle.contains("trade.candles.update"));

    subscription.close().await;
    ws_server.await.unwrap();
}

#[tokio::test]
async fn slow_rest_call_times_out() {
    let (server, provider) = provider().await;
    let provider = provider.with_timeout(Duration::from_millis(100));
    Mock::given(method("GET"))
        .and(path("/api/v2/symbols"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": "200000", "data": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let result = provider.symbols().await;

    assert!(matches!(result, Err(ProviderError::Transport(_))));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn stalled_stream_handshake_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    // accepts the socket but never answers the upgrade request
    let silent = tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let (server, provider) = provider().await;
    let provider = provider.with_timeout(Duration::from_millis(200));
    Mock::given(method("POST"))
        .and(path("/api/v1/bullet-public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "200000",
            "data": {
                "token": "public-token",
                "instanceServers": [{
                    "endpoint": format!("ws://127.0.0.1:{}", port),
                    "encrypt": false,
                    "protocol": "websocket",
                    "pingInterval": 50000,
                    "pingTimeout": 10000
                }]
            }
        })))
        .mount(&server)
        .await;

    let result = provider.subscribe("BTC-USDT", Granularity::OneMinute).await;

    assert!(matches!(result, Err(ProviderError::Transport(ref msg)) if msg.contains("timed out")));
    silent.abort();
}
