use jtrader::models::{ChainEntry, ChainResult, PeriodMode, SignalType};
use jtrader::services::{format_signal_message, LogNotifier, Notifier};
use serde_json::Map;

fn result(signal: SignalType, names: &[&str]) -> ChainResult {
    ChainResult {
        chain: "Chain".to_string(),
        signal,
        entries: names
            .iter()
            .map(|name| ChainEntry {
                indicator: name.to_string(),
                signal,
                metadata: Map::new(),
            })
            .collect(),
    }
}

#[test]
fn message_lists_indicators_mode_and_direction() {
    let message = format_signal_message(
        "AAA",
        PeriodMode::Intraday,
        &result(SignalType::Bullish, &["RSI", "Volume"]),
    );
    assert_eq!(message, r#"AAA triggered ["RSI","Volume"] (intraday, BULLISH)"#);
}

#[test]
fn swing_bearish_message() {
    let message = format_signal_message("ETH-USDT", PeriodMode::Swing, &result(SignalType::Bearish, &["MACD"]));
    assert_eq!(message, r#"ETH-USDT triggered ["MACD"] (swing, BEARISH)"#);
}

#[test]
fn log_notifier_never_fails() {
    let notifier = LogNotifier;
    let signal = result(SignalType::Bullish, &["RSI"]);

    tokio_test::assert_ok!(tokio_test::block_on(notifier.notify("AAA", PeriodMode::Intraday, &signal)));
    tokio_test::assert_ok!(tokio_test::block_on(notifier.announce("Starting intraday scan")));
}
