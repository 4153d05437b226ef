use jtrader::error::DecodeError;
use jtrader::models::Granularity;
use jtrader::services::kucoin::messages::{PingRequest, SubscribeRequest};
use jtrader::services::kucoin::{candle_topic, KucoinDecoder};
use jtrader::services::{StreamDecoder, StreamEvent};

fn candle_message(subject: &str) -> String {
    format!(
        r#"{{"type":"message","topic":"/market/candles:BTC-USDT_1min","subject":"{}","data":{{"symbol":"BTC-USDT","candles":["1700000040","100.5","101.5","102","99.5","12.5","1260"],"time":1700000059000000000}}}}"#,
        subject
    )
}

#[test]
fn control_frames_are_confirmations() {
    let decoder = KucoinDecoder;
    for payload in [
        r#"{"id":"abc","type":"welcome"}"#,
        r#"{"id":"1","type":"ack"}"#,
        r#"{"id":"2","type":"pong"}"#,
    ] {
        assert_eq!(decoder.decode(payload).unwrap(), StreamEvent::Confirmation);
    }
}

#[test]
fn candle_add_and_update_decode_to_bars() {
    let decoder = KucoinDecoder;
    for subject in ["trade.candles.add", "trade.candles.update"] {
        let StreamEvent::Bar(bar) = decoder.decode(&candle_message(subject)).unwrap() else {
            panic!("expected a bar for {}", subject);
        };
        assert_eq!(bar.timestamp.timestamp(), 1_700_000_040);
        assert_eq!(bar.open, 100.5);
        assert_eq!(bar.close, 101.5);
        assert_eq!(bar.high, 102.0);
        assert_eq!(bar.low, 99.5);
        assert_eq!(bar.volume, 12.5);
    }
}

#[test]
fn other_subjects_are_ignored() {
    let decoder = KucoinDecoder;
    let payload = r#"{"type":"message","subject":"trade.ticker","data":{"price":"1"}}"#;
    assert_eq!(decoder.decode(payload).unwrap(), StreamEvent::Ignored);
}

#[test]
fn malformed_payloads_are_errors() {
    let decoder = KucoinDecoder;
    assert!(decoder.decode("not json").is_err());
    assert!(decoder
        .decode(r#"{"type":"message","subject":"trade.candles.add","data":{"candles":["1700000040","1"]}}"#)
        .is_err());
    assert!(matches!(
        decoder.decode(r#"{"type":"message","subject":"trade.candles.add","data":{"candles":["soon","1","2","3","4","5"]}}"#),
        Err(DecodeError::Malformed(_))
    ));
    assert!(decoder.decode(r#"{"type":"error","code":401,"data":"token expired"}"#).is_err());
}

#[test]
fn subscribe_request_targets_candle_topic() {
    assert_eq!(candle_topic("ETH-USDT", Granularity::FiveMinutes), "/market/candles:ETH-USDT_5min");

    let request = serde_json::to_value(SubscribeRequest::candles("7", "BTC-USDT", Granularity::OneMinute)).unwrap();
    assert_eq!(
        request,
        serde_json::json!({
            "id": "7",
            "type": "subscribe",
            "topic": "/market/candles:BTC-USDT_1min",
            "privateChannel": false,
            "response": true
        })
    );

    let ping = serde_json::to_value(PingRequest::new("8")).unwrap();
    assert_eq!(ping, serde_json::json!({"id": "8", "type": "ping"}));
}
