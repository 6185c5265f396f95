// src/zones/registry.rs
// Owns the live zone collection and every lifecycle transition on it.
// Zones enter through deduplicating insertion and leave through eviction;
// nothing outside this module mutates a zone once inserted.

use log::{debug, info};

use crate::config::DedupPolicy;
use crate::types::{Bar, Zone, ZoneKind};

pub struct ZoneRegistry {
    zones: Vec<Zone>,
    dedup_policy: DedupPolicy,
    stale_window_bars: usize,
}

impl ZoneRegistry {
    pub fn new(dedup_policy: DedupPolicy, stale_window_bars: usize) -> Self {
        Self {
            zones: Vec::new(),
            dedup_policy,
            stale_window_bars,
        }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Zone> {
        self.zones.iter()
    }

    /// Zones still in play: unfilled. Staleness is enforced by the
    /// per-bar eviction pass, so everything here is younger than the
    /// stale window.
    pub fn active(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| !z.is_filled())
    }

    pub fn kind_counts(&self) -> (usize, usize) {
        let bullish = self
            .zones
            .iter()
            .filter(|z| z.kind() == ZoneKind::Bullish)
            .count();
        (bullish, self.zones.len() - bullish)
    }

    /// Insert a candidate unless a same-kind, unfilled zone already covers
    /// an overlapping price range. Under the keep-smaller policy a
    /// strictly tighter candidate replaces every overlapping zone; a
    /// candidate of equal or larger gap is discarded. Returns whether the
    /// candidate was inserted.
    pub fn insert_if_not_duplicate(&mut self, candidate: Zone) -> bool {
        let overlapping: Vec<usize> = self
            .zones
            .iter()
            .enumerate()
            .filter(|(_, z)| {
                z.kind() == candidate.kind() && !z.is_filled() && z.overlaps(&candidate)
            })
            .map(|(i, _)| i)
            .collect();

        if overlapping.is_empty() {
            info!(
                "[REGISTRY] New {} zone {}: {:.2} - {:.2} ({:.2}pts)",
                candidate.kind(),
                candidate.id(),
                candidate.bottom(),
                candidate.top(),
                candidate.gap_size()
            );
            self.zones.push(candidate);
            return true;
        }

        match self.dedup_policy {
            DedupPolicy::KeepExisting => {
                debug!(
                    "[REGISTRY] Discarded overlapping {} candidate {:.2} - {:.2} (existing zone wins)",
                    candidate.kind(),
                    candidate.bottom(),
                    candidate.top()
                );
                false
            }
            DedupPolicy::KeepSmaller => {
                let candidate_wins = overlapping
                    .iter()
                    .all(|&i| candidate.gap_size() < self.zones[i].gap_size());

                if !candidate_wins {
                    debug!(
                        "[REGISTRY] Discarded overlapping {} candidate {:.2} - {:.2} ({:.2}pts not smaller)",
                        candidate.kind(),
                        candidate.bottom(),
                        candidate.top(),
                        candidate.gap_size()
                    );
                    return false;
                }

                for &i in overlapping.iter().rev() {
                    let removed = self.zones.remove(i);
                    debug!(
                        "[REGISTRY] Removed wider zone {} ({:.2}pts) for tighter candidate",
                        removed.id(),
                        removed.gap_size()
                    );
                }
                info!(
                    "[REGISTRY] Replaced {} overlapping zone(s) with tighter {} zone {}: {:.2} - {:.2} ({:.2}pts)",
                    overlapping.len(),
                    candidate.kind(),
                    candidate.id(),
                    candidate.bottom(),
                    candidate.top(),
                    candidate.gap_size()
                );
                self.zones.push(candidate);
                true
            }
        }
    }

    /// Fill check against a completed bar's close. Runs once per new bar.
    pub fn mark_filled_by_bar_close(&mut self, bar: &Bar) {
        self.mark_filled_at(bar.close, "bar close");
    }

    /// Same predicate against the live tick, run on every price update,
    /// so an intrabar retracement fills the zone ahead of the bar close.
    pub fn mark_filled_by_live_price(&mut self, price: f64) {
        self.mark_filled_at(price, "live price");
    }

    fn mark_filled_at(&mut self, price: f64, source: &str) {
        for zone in self.zones.iter_mut().filter(|z| !z.is_filled()) {
            let filled = match zone.kind() {
                ZoneKind::Bullish => price <= zone.bottom(),
                ZoneKind::Bearish => price >= zone.top(),
            };
            if filled {
                zone.mark_filled();
                info!(
                    "[REGISTRY] {} zone {} filled at {:.2} ({})",
                    zone.kind(),
                    zone.id(),
                    price,
                    source
                );
            }
        }
    }

    /// Drop every filled zone and every zone at or past the stale window.
    /// Runs once per new bar, after detection and fill-marking.
    pub fn evict_stale_and_filled(&mut self, current_bar_index: usize) {
        let before = self.zones.len();
        let stale_window = self.stale_window_bars;
        self.zones
            .retain(|z| !z.is_filled() && z.age_in_bars(current_bar_index) < stale_window);

        let removed = before - self.zones.len();
        if removed > 0 {
            info!(
                "[REGISTRY] Evicted {} filled/stale zone(s), {} remain",
                removed,
                self.zones.len()
            );
        }
    }

    /// One-way trade-taken transition, driven by the retest evaluator.
    pub fn mark_trade_taken(&mut self, zone_id: &str) -> bool {
        match self.zones.iter_mut().find(|z| z.id() == zone_id) {
            Some(zone) => {
                zone.mark_trade_taken();
                true
            }
            None => false,
        }
    }
}
