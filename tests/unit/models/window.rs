use jtrader::models::{SlidingWindow, Window, WindowUpdate};

use crate::support::{bar, ts};

#[test]
fn appending_at_capacity_evicts_oldest() {
    let mut sliding = SlidingWindow::new(5);
    sliding.seed((0..5).map(|m| bar(m, 100.0 + m as f64)));
    assert_eq!(sliding.len(), 5);

    let update = sliding.apply(bar(5, 105.0));

    assert_eq!(update, WindowUpdate::Appended { evicted: 1 });
    assert_eq!(sliding.len(), 5);
    assert_eq!(sliding.window().first().unwrap().timestamp, ts(1));
    assert_eq!(sliding.window().latest().unwrap().timestamp, ts(5));
}

#[test]
fn appending_below_capacity_grows_window() {
    let mut sliding = SlidingWindow::new(5);
    sliding.seed(vec![bar(0, 1.0), bar(1, 2.0)]);

    assert_eq!(sliding.apply(bar(2, 3.0)), WindowUpdate::Appended { evicted: 0 });
    assert_eq!(sliding.len(), 3);
}

#[test]
fn same_period_update_replaces_in_place() {
    let mut sliding = SlidingWindow::new(3);
    sliding.seed(vec![bar(0, 1.0), bar(1, 2.0), bar(2, 3.0)]);

    assert_eq!(sliding.apply(bar(2, 9.0)), WindowUpdate::Replaced);
    assert_eq!(sliding.len(), 3);
    assert_eq!(sliding.window().closes(), vec![1.0, 2.0, 9.0]);
}

#[test]
fn older_bar_is_stale_and_ignored() {
    let mut sliding = SlidingWindow::new(3);
    sliding.seed(vec![bar(0, 1.0), bar(1, 2.0), bar(2, 3.0)]);

    let update = sliding.apply(bar(1, 7.0));

    assert_eq!(update, WindowUpdate::Stale);
    assert!(!update.is_mutation());
    assert_eq!(sliding.window().closes(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn seeding_keeps_newest_capacity_bars() {
    let mut sliding = SlidingWindow::new(20);
    let evicted = sliding.seed((0..30).rev().map(|m| bar(m, m as f64)));

    assert_eq!(evicted, 10);
    assert_eq!(sliding.len(), 20);
    assert_eq!(sliding.window().first().unwrap().timestamp, ts(10));
    assert_eq!(sliding.window().latest().unwrap().timestamp, ts(29));
}

#[test]
fn window_normalizes_newest_first_input() {
    let window = Window::from_bars(vec![bar(2, 3.0), bar(0, 1.0), bar(1, 2.0), bar(1, 5.0)]);
    assert_eq!(window.len(), 3);
    assert_eq!(window.closes(), vec![1.0, 5.0, 3.0]);
}

#[test]
fn lower_low_compares_latest_against_all_prior_bars() {
    let falling = Window::from_bars(vec![bar(0, 10.0), bar(1, 12.0), bar(2, 8.0)]);
    assert!(falling.has_lower_low());
    assert!(!falling.has_higher_high());

    let single = Window::from_bars(vec![bar(0, 10.0)]);
    assert!(!single.has_lower_low());
}
