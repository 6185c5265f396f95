// tests/fvg_engine_tests.rs
//
// End-to-end scenarios driving the zone monitor with scripted feeds and
// an inspectable sink, covering the full bar -> zone -> retest -> signal
// flow without touching the filesystem.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use fvg_detector::config::EngineConfig;
use fvg_detector::errors::{FeedError, SinkError};
use fvg_detector::realtime::feed::{BarFeed, PriceFeed};
use fvg_detector::realtime::monitor::ZoneMonitor;
use fvg_detector::trading::signal_sink::{MemorySignalSink, SignalSink};
use fvg_detector::trading::trade_history::TradeHistory;
use fvg_detector::types::{Bar, Direction, Signal, ZoneKind};

struct ScriptedBarFeed {
    batches: VecDeque<Vec<Bar>>,
}

impl ScriptedBarFeed {
    fn new(batches: Vec<Vec<Bar>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

impl BarFeed for ScriptedBarFeed {
    fn poll_new_bars(&mut self) -> Result<Vec<Bar>, FeedError> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

struct ScriptedPriceFeed {
    prices: VecDeque<f64>,
}

impl ScriptedPriceFeed {
    fn new(prices: Vec<f64>) -> Self {
        Self {
            prices: prices.into(),
        }
    }
}

impl PriceFeed for ScriptedPriceFeed {
    fn latest_price(&mut self) -> Result<Option<f64>, FeedError> {
        Ok(self.prices.pop_front())
    }
}

/// Sink handle the test keeps after the monitor takes ownership.
#[derive(Clone)]
struct SharedSink(Arc<Mutex<MemorySignalSink>>);

impl SharedSink {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(MemorySignalSink::new())))
    }

    fn signals(&self) -> Vec<Signal> {
        self.0.lock().unwrap().signals.clone()
    }

    fn set_failing(&self, failing: bool) {
        self.0.lock().unwrap().fail_writes = failing;
    }
}

impl SignalSink for SharedSink {
    fn record(&mut self, signal: &Signal) -> Result<(), SinkError> {
        self.0.lock().unwrap().record(signal)
    }
}

fn bar(hour: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
        open,
        high,
        low,
        close,
    }
}

/// The canonical bullish gap: (H=10), (H=11, L=10.5), (L=15).
fn bullish_gap_bars() -> Vec<Bar> {
    vec![
        bar(0, 9.5, 10.0, 9.0, 9.8),
        bar(1, 10.2, 11.0, 10.5, 10.8),
        bar(2, 15.2, 16.0, 15.0, 15.8),
    ]
}

fn monitor_with(
    batches: Vec<Vec<Bar>>,
    prices: Vec<f64>,
    sink: SharedSink,
) -> ZoneMonitor {
    ZoneMonitor::new(
        EngineConfig::default(),
        Box::new(ScriptedBarFeed::new(batches)),
        Box::new(ScriptedPriceFeed::new(prices)),
        Box::new(sink),
        TradeHistory::in_memory(),
    )
}

#[test]
fn test_end_to_end_bullish_retest_emits_short() {
    let sink = SharedSink::new();
    let mut monitor = monitor_with(vec![bullish_gap_bars()], vec![12.0, 12.0], sink.clone());

    monitor.seed_from_history().unwrap();
    assert_eq!(monitor.registry().len(), 1);
    let zone = monitor.registry().iter().next().unwrap();
    assert_eq!(zone.kind(), ZoneKind::Bullish);
    assert_eq!(zone.bottom(), 10.0);
    assert_eq!(zone.top(), 15.0);
    assert_eq!(zone.gap_size(), 5.0);

    // Price ticks inside the zone
    monitor.run_iteration();

    let signals = sink.signals();
    assert_eq!(signals.len(), 1);
    let signal = &signals[0];
    assert_eq!(signal.direction, Direction::Short);
    assert_eq!(signal.entry_price, 12.0);
    assert_eq!(signal.stop_loss, 25.0); // top + max(floor 10, gap 5)
    assert_eq!(signal.legs.len(), 2);
    assert_eq!(signal.legs[1].target_price, 10.0); // Zone bottom runner
    assert_eq!(signal.zone_kind, ZoneKind::Bullish);

    // Same price again: the zone already traded, nothing new
    monitor.run_iteration();
    assert_eq!(sink.signals().len(), 1);
}

#[test]
fn test_equal_size_overlapping_bearish_candidate_is_discarded() {
    // Seed produces a bearish zone {bottom 7, top 10}; a later triple
    // produces an overlapping bearish zone {bottom 5, top 8} of equal
    // gap size, which must lose to the existing zone.
    let seed = vec![
        bar(0, 10.5, 11.0, 10.0, 10.4),
        bar(1, 9.0, 9.5, 8.5, 8.8),
        bar(2, 6.5, 7.0, 6.0, 6.4),
    ];
    let update = vec![
        bar(3, 8.4, 8.6, 8.0, 8.2),
        bar(4, 7.0, 7.5, 6.5, 6.8),
        bar(5, 4.6, 5.0, 4.2, 4.4),
    ];

    let sink = SharedSink::new();
    let mut monitor = monitor_with(vec![seed, update], vec![], sink);

    monitor.seed_from_history().unwrap();
    assert_eq!(monitor.registry().len(), 1);

    monitor.run_iteration();
    assert_eq!(monitor.bar_count(), 6);
    assert_eq!(monitor.registry().len(), 1);
    let kept = monitor.registry().iter().next().unwrap();
    assert_eq!(kept.kind(), ZoneKind::Bearish);
    assert_eq!(kept.bottom(), 7.0);
    assert_eq!(kept.top(), 10.0);
}

#[test]
fn test_live_price_fill_preempts_retest() {
    let sink = SharedSink::new();
    // First tick retraces through the zone bottom, filling it intrabar;
    // the second tick back inside must not trade a filled zone.
    let mut monitor = monitor_with(vec![bullish_gap_bars()], vec![9.5, 12.0], sink.clone());

    monitor.seed_from_history().unwrap();
    monitor.run_iteration();
    monitor.run_iteration();

    assert!(sink.signals().is_empty());
}

#[test]
fn test_sink_outage_retries_next_tick() {
    let sink = SharedSink::new();
    sink.set_failing(true);
    let mut monitor = monitor_with(vec![bullish_gap_bars()], vec![12.0, 12.0], sink.clone());

    monitor.seed_from_history().unwrap();
    monitor.run_iteration();
    assert!(sink.signals().is_empty());
    assert!(!monitor.registry().iter().next().unwrap().trade_taken());

    sink.set_failing(false);
    monitor.run_iteration();
    assert_eq!(sink.signals().len(), 1);
    assert!(monitor.registry().iter().next().unwrap().trade_taken());
}

#[test]
fn test_seeding_skips_zones_filled_by_later_closes() {
    // The bullish gap forms at index 2, then a later bar closes back
    // below the zone bottom; on startup that zone must not come back.
    let mut bars = bullish_gap_bars();
    bars.push(bar(3, 15.0, 15.5, 9.0, 9.5));

    let sink = SharedSink::new();
    let mut monitor = monitor_with(vec![bars], vec![], sink);

    monitor.seed_from_history().unwrap();
    assert_eq!(monitor.registry().len(), 0);
}

#[test]
fn test_bar_close_fill_runs_before_price_evaluation() {
    // The new bar closes through the zone bottom in the same iteration
    // as an in-zone tick: the bar pass fills and evicts the zone first,
    // so no signal fires.
    let update = vec![bar(3, 10.5, 10.8, 9.2, 9.5)];

    let sink = SharedSink::new();
    let mut monitor = monitor_with(
        vec![bullish_gap_bars(), update],
        vec![12.0],
        sink.clone(),
    );

    monitor.seed_from_history().unwrap();
    monitor.run_iteration();

    assert!(sink.signals().is_empty());
    assert_eq!(monitor.registry().len(), 0);
}

#[test]
fn test_stale_zone_evicted_after_window() {
    // Feed 100 quiet bars after the gap forms; the zone ages out at
    // exactly the stale window.
    let sink = SharedSink::new();

    let mut quiet = Vec::new();
    for i in 3..103 {
        // Wicking into the zone but never closing through it, and never
        // leaving a fresh 3-bar gap
        let base = 15.5 + (i % 3) as f64 * 0.1;
        quiet.push(Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
                + chrono::Duration::hours(i as i64),
            open: base,
            high: base + 0.5,
            low: 10.5,
            close: base + 0.2,
        });
    }
    let last_quiet = quiet.split_off(99);
    assert_eq!(last_quiet.len(), 1);

    let mut monitor = monitor_with(vec![bullish_gap_bars(), quiet, last_quiet], vec![], sink);

    monitor.seed_from_history().unwrap();
    assert_eq!(monitor.registry().len(), 1);

    // Bars 3..=101: zone age reaches 99, still retained
    monitor.run_iteration();
    assert_eq!(monitor.registry().len(), 1);

    // Bar 102: age 100, evicted
    monitor.run_iteration();
    assert_eq!(monitor.registry().len(), 0);
}

#[test]
fn test_bearish_zone_retest_emits_long() {
    let seed = vec![
        bar(0, 20.5, 21.0, 20.0, 20.2),
        bar(1, 19.5, 19.8, 18.5, 18.8),
        bar(2, 15.5, 16.0, 15.0, 15.2),
    ];

    let sink = SharedSink::new();
    let mut monitor = monitor_with(vec![seed], vec![17.1], sink.clone());

    monitor.seed_from_history().unwrap();
    let zone = monitor.registry().iter().next().unwrap();
    assert_eq!(zone.kind(), ZoneKind::Bearish);
    assert_eq!(zone.bottom(), 16.0);
    assert_eq!(zone.top(), 20.0);

    monitor.run_iteration();

    let signals = sink.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].direction, Direction::Long);
    assert_eq!(signals[0].entry_price, 17.0); // 17.1 snapped to the tick
    assert_eq!(signals[0].stop_loss, 6.0); // bottom - max(10, gap 4)
}
