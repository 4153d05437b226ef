//! Streaming trader lifecycle against channel-backed subscriptions.

use std::sync::Arc;
use std::time::Duration;

use jtrader::core::{run_traders, MessageOutcome, Trader, TraderConfig, TraderState};
use jtrader::error::TraderError;
use jtrader::metrics::Metrics;
use jtrader::models::{Bar, PeriodMode, SignalType, WindowUpdate};
use jtrader::services::KucoinDecoder;
use tokio::sync::watch;

use crate::test_utils::{
    eventually, kucoin_candle, minute_bars, rsi_volume_chain, ChannelStream, FakeChart,
    RecordingNotifier,
};

fn config(capacity: usize) -> TraderConfig {
    TraderConfig {
        capacity,
        max_attempts: 3,
        min_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        ..TraderConfig::default()
    }
}

fn trader(
    chart: Arc<FakeChart>,
    stream: Arc<ChannelStream>,
    notifier: Arc<RecordingNotifier>,
    capacity: usize,
) -> Trader {
    Trader::new(
        "AAA",
        chart,
        stream,
        Arc::new(KucoinDecoder),
        notifier,
        rsi_volume_chain(),
        config(capacity),
    )
}

/// Next bar continuing the falling, closing-on-high series.
fn follow_on(last: &Bar, minutes: i64) -> Bar {
    let close = last.close - minutes as f64;
    Bar::new(
        last.timestamp + chrono::Duration::minutes(minutes),
        close - 0.5,
        close,
        close - 1.0,
        close,
        100.0,
    )
}

#[tokio::test]
async fn seed_keeps_newest_capacity_bars() {
    let bars = minute_bars(30);
    let chart = Arc::new(FakeChart::new().with_bars("AAA", bars.clone()));
    let mut trader = trader(
        chart,
        Arc::new(ChannelStream::new()),
        Arc::new(RecordingNotifier::new()),
        20,
    );
    assert_eq!(trader.state(), TraderState::Disconnected);

    let len = trader.seed().await.unwrap();

    assert_eq!(len, 20);
    assert_eq!(trader.state(), TraderState::Seeded);
    assert_eq!(trader.window().first().unwrap().timestamp, bars[10].timestamp);
    assert_eq!(trader.window().latest().unwrap().timestamp, bars[29].timestamp);
}

#[tokio::test]
async fn messages_update_window_and_reevaluate() {
    let bars = minute_bars(50);
    let last = bars[49].clone();
    let chart = Arc::new(FakeChart::new().with_bars("AAA", bars.clone()));
    let notifier = Arc::new(RecordingNotifier::new());
    let mut trader = trader(chart, Arc::new(ChannelStream::new()), notifier.clone(), 50);
    trader.seed().await.unwrap();

    assert_eq!(
        trader.handle_message(r#"{"id":"1","type":"welcome"}"#).await,
        MessageOutcome::Confirmation
    );
    assert_eq!(trader.handle_message("{not json").await, MessageOutcome::Discarded);
    assert_eq!(
        trader
            .handle_message(r#"{"type":"message","subject":"trade.ticker","data":{}}"#)
            .await,
        MessageOutcome::Ignored
    );
    assert_eq!(
        trader.handle_message(&kucoin_candle("AAA", &bars[10])).await,
        MessageOutcome::Stale
    );
    assert!(notifier.notifications().is_empty());

    let MessageOutcome::Evaluated { update, signal } =
        trader.handle_message(&kucoin_candle("AAA", &last)).await
    else {
        panic!("same-period update should be evaluated");
    };
    assert_eq!(update, WindowUpdate::Replaced);
    assert_eq!(signal.map(|s| s.signal), Some(SignalType::Bullish));
    assert_eq!(trader.window().len(), 50);

    let MessageOutcome::Evaluated { update, .. } =
        trader.handle_message(&kucoin_candle("AAA", &follow_on(&last, 1))).await
    else {
        panic!("new period should be evaluated");
    };
    assert_eq!(update, WindowUpdate::Appended { evicted: 1 });
    assert_eq!(trader.window().len(), 50);
    assert_eq!(trader.window().first().unwrap().timestamp, bars[1].timestamp);

    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().all(|(i, m, _)| i == "AAA" && *m == PeriodMode::Intraday));
}

#[tokio::test]
async fn run_streams_until_shutdown() {
    let bars = minute_bars(50);
    let next = follow_on(&bars[49], 1);
    let chart = Arc::new(FakeChart::new().with_bars("AAA", bars));
    let stream = Arc::new(ChannelStream::new());
    let tx = stream.push();
    let notifier = Arc::new(RecordingNotifier::new());
    let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
    let trader = trader(chart, stream.clone(), notifier.clone(), 50).with_metrics(metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(trader.run(shutdown_rx));

    tx.send(kucoin_candle("AAA", &next)).await.unwrap();
    assert!(eventually(|| notifier.notifications().len() == 1).await);
    assert_eq!(metrics.active_traders.get(), 1.0);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(stream.subscribes(), 1);
    assert_eq!(metrics.active_traders.get(), 0.0);
    assert_eq!(metrics.stream_messages_total.get(), 1.0);
}

#[tokio::test]
async fn unexpected_stream_end_reseeds_and_resubscribes() {
    let chart = Arc::new(FakeChart::new().with_bars("AAA", minute_bars(50)));
    let stream = Arc::new(ChannelStream::new());
    drop(stream.push());
    let _live = stream.push();
    let trader = trader(chart.clone(), stream.clone(), Arc::new(RecordingNotifier::new()), 50);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(trader.run(shutdown_rx));

    assert!(eventually(|| stream.subscribes() == 2).await);
    assert_eq!(chart.calls(), 2);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn seed_failure_terminates_after_retries() {
    let chart = Arc::new(FakeChart::new().failing("AAA"));
    let stream = Arc::new(ChannelStream::new());
    let trader = trader(chart.clone(), stream.clone(), Arc::new(RecordingNotifier::new()), 50);

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let result = trader.run(shutdown_rx).await;

    assert!(matches!(result, Err(TraderError::Seed { ref instrument, .. }) if instrument == "AAA"));
    assert!(chart.calls() >= 2);
    assert_eq!(stream.subscribes(), 0);
}

#[tokio::test]
async fn traders_run_independently_and_stop_together() {
    let chart = Arc::new(
        FakeChart::new()
            .with_bars("AAA", minute_bars(50))
            .with_bars("BBB", minute_bars(50)),
    );
    let stream = Arc::new(ChannelStream::new());
    let _a = stream.push();
    let _b = stream.push();
    let notifier = Arc::new(RecordingNotifier::new());

    let traders = ["AAA", "BBB"]
        .into_iter()
        .map(|id| {
            Trader::new(
                id,
                chart.clone(),
                stream.clone(),
                Arc::new(KucoinDecoder),
                notifier.clone(),
                rsi_volume_chain(),
                config(50),
            )
        })
        .collect();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_traders(traders, shutdown_rx));

    assert!(eventually(|| stream.subscribes() == 2).await);
    shutdown_tx.send(true).unwrap();

    let mut results = handle.await.unwrap();
    results.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "AAA");
    assert_eq!(results[1].0, "BBB");
    assert!(results.iter().all(|(_, r)| r.is_ok()));
}

#[tokio::test]
async fn repeatedly_closing_stream_is_paced() {
    let chart = Arc::new(FakeChart::new().with_bars("AAA", minute_bars(50)));
    let stream = Arc::new(ChannelStream::new());
    for _ in 0..500 {
        drop(stream.push());
    }
    let trader = Trader::new(
        "AAA",
        chart.clone(),
        stream.clone(),
        Arc::new(KucoinDecoder),
        Arc::new(RecordingNotifier::new()),
        rsi_volume_chain(),
        TraderConfig {
            capacity: 50,
            min_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(200),
            ..TraderConfig::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(trader.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(300)).await;

    // 20 + 40 + 80 + 160ms between cycles
    let subscribes = stream.subscribes();
    assert!((2..=6).contains(&subscribes), "subscribed {} times", subscribes);

    shutdown_tx.send(true).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(1), handle).await;
    assert!(matches!(stopped, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn shutdown_interrupts_seed_retries() {
    let chart = Arc::new(FakeChart::new().failing("AAA"));
    let stream = Arc::new(ChannelStream::new());
    let trader = Trader::new(
        "AAA",
        chart.clone(),
        stream.clone(),
        Arc::new(KucoinDecoder),
        Arc::new(RecordingNotifier::new()),
        rsi_volume_chain(),
        TraderConfig {
            capacity: 50,
            max_attempts: 5,
            min_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(60),
            ..TraderConfig::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(trader.run(shutdown_rx));
    assert!(eventually(|| chart.calls() == 1).await);

    shutdown_tx.send(true).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(1), handle).await;

    assert!(matches!(stopped, Ok(Ok(Ok(())))));
    assert_eq!(chart.calls(), 1);
    assert_eq!(stream.subscribes(), 0);
}

#[tokio::test]
async fn unrepresentable_capacity_fails_before_fetching() {
    let chart = Arc::new(FakeChart::new().with_bars("AAA", minute_bars(50)));
    let mut trader = trader(
        chart.clone(),
        Arc::new(ChannelStream::new()),
        Arc::new(RecordingNotifier::new()),
        usize::MAX,
    );

    let result = trader.seed().await;

    assert!(matches!(
        result,
        Err(TraderError::CapacityOutOfRange { capacity, .. }) if capacity == usize::MAX
    ));
    assert_eq!(chart.calls(), 0);
}
