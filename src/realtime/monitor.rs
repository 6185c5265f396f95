// src/realtime/monitor.rs
// The cooperative polling loop. Bar work (detect, dedup-insert, bar-close
// fill, evict) always completes before the same iteration's live-price
// work (intrabar fill, retest evaluation), so a retest never runs against
// stale zone state.

use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::config::EngineConfig;
use crate::errors::FeedError;
use crate::realtime::feed::{BarFeed, PriceFeed};
use crate::trading::retest_evaluator::RetestEvaluator;
use crate::trading::signal_sink::SignalSink;
use crate::trading::trade_history::TradeHistory;
use crate::types::{Bar, Zone, ZoneKind};
use crate::zones::gap_detector::GapDetector;
use crate::zones::registry::ZoneRegistry;

pub struct ZoneMonitor {
    config: EngineConfig,
    detector: GapDetector,
    registry: ZoneRegistry,
    evaluator: RetestEvaluator,
    history: TradeHistory,
    sink: Box<dyn SignalSink + Send>,
    bar_feed: Box<dyn BarFeed + Send>,
    price_feed: Box<dyn PriceFeed + Send>,
    bars: Vec<Bar>,
}

impl ZoneMonitor {
    pub fn new(
        config: EngineConfig,
        bar_feed: Box<dyn BarFeed + Send>,
        price_feed: Box<dyn PriceFeed + Send>,
        sink: Box<dyn SignalSink + Send>,
        history: TradeHistory,
    ) -> Self {
        let detector = GapDetector::new(config.min_gap_size);
        let registry = ZoneRegistry::new(config.dedup_policy, config.stale_window_bars);
        let evaluator = RetestEvaluator::new(config.clone());

        Self {
            config,
            detector,
            registry,
            evaluator,
            history,
            sink,
            bar_feed,
            price_feed,
            bars: Vec::new(),
        }
    }

    /// Scan whatever history the bar feed already has so the registry
    /// starts with the zones that survived past price action.
    pub fn seed_from_history(&mut self) -> Result<(), FeedError> {
        let bars = self.bar_feed.poll_new_bars()?;
        if bars.len() < 3 {
            info!("[MONITOR] Not enough historical bars to scan for zones");
            self.bars = bars;
            return Ok(());
        }
        self.bars = bars;

        let candidates = self.detector.scan(&self.bars);
        let scanned = candidates.len();
        for zone in candidates {
            // A zone already closed through its far boundary never
            // becomes active
            if Self::filled_by_later_close(&zone, &self.bars) {
                continue;
            }
            self.registry.insert_if_not_duplicate(zone);
        }

        let current_index = self.bars.len() - 1;
        self.registry.evict_stale_and_filled(current_index);

        let (bullish, bearish) = self.registry.kind_counts();
        info!(
            "[MONITOR] Seeded {} active zone(s) from {} historical bars ({} candidates scanned)",
            self.registry.len(),
            self.bars.len(),
            scanned
        );
        info!("[MONITOR]   - {} bullish, {} bearish", bullish, bearish);
        Ok(())
    }

    fn filled_by_later_close(zone: &Zone, bars: &[Bar]) -> bool {
        bars.iter()
            .skip(zone.created_at_bar_index() + 1)
            .any(|bar| match zone.kind() {
                ZoneKind::Bullish => bar.close <= zone.bottom(),
                ZoneKind::Bearish => bar.close >= zone.top(),
            })
    }

    /// One polling iteration: the bar pass, then the live-price pass.
    pub fn run_iteration(&mut self) {
        match self.bar_feed.poll_new_bars() {
            Ok(new_bars) if !new_bars.is_empty() => self.process_new_bars(new_bars),
            Ok(_) => {}
            Err(e) => error!("[MONITOR] Bar feed error, skipping this cycle: {}", e),
        }

        match self.price_feed.latest_price() {
            Ok(Some(price)) => self.handle_live_price(price),
            Ok(None) => debug!("[MONITOR] No live price this cycle"),
            Err(e) => error!("[MONITOR] Price feed error, skipping this cycle: {}", e),
        }
    }

    fn process_new_bars(&mut self, new_bars: Vec<Bar>) {
        for bar in new_bars {
            info!(
                "[MONITOR] New bar at {} (close {:.2})",
                bar.timestamp, bar.close
            );
            self.bars.push(bar);
            let index = self.bars.len() - 1;

            if let Some(zone) = self.detector.detect(&self.bars, index) {
                self.registry.insert_if_not_duplicate(zone);
            }
            self.registry.mark_filled_by_bar_close(&bar);
            self.registry.evict_stale_and_filled(index);
        }
    }

    fn handle_live_price(&mut self, price: f64) {
        self.registry.mark_filled_by_live_price(price);

        let signals = self.evaluator.evaluate(
            &mut self.registry,
            &mut self.history,
            self.sink.as_mut(),
            price,
            Utc::now(),
        );
        for signal in &signals {
            info!(
                "[MONITOR] Signal recorded: {} @ {:.2} (zone {:.2} - {:.2})",
                signal.direction, signal.entry_price, signal.zone_bottom, signal.zone_top
            );
        }
    }

    /// Poll until the stop signal flips. State is pure in-memory, so
    /// stopping mid-iteration needs no rollback.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        info!(
            "[MONITOR] Polling every {}s for new bars and live prices...",
            self.config.poll_interval_secs.max(1)
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_iteration(),
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            "[MONITOR] Stopped with {} zone(s) still tracked",
            self.registry.len()
        );
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }
}
