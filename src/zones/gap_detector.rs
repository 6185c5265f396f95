// src/zones/gap_detector.rs
// Three-bar imbalance detection. Pure over the bar window, no side
// effects, so the same code seeds from history and runs incrementally.

use log::warn;

use crate::types::{Bar, Zone, ZoneKind};

pub struct GapDetector {
    min_gap_size: f64,
}

impl GapDetector {
    pub fn new(min_gap_size: f64) -> Self {
        Self { min_gap_size }
    }

    /// Examine the 3-bar window ending at `index`. The middle bar is part
    /// of the pattern but places no constraint on the comparison.
    pub fn detect(&self, bars: &[Bar], index: usize) -> Option<Zone> {
        if index < 2 || index >= bars.len() {
            return None;
        }

        let first = &bars[index - 2];
        let third = &bars[index];

        let (kind, top, bottom) = if third.low > first.high {
            (ZoneKind::Bullish, third.low, first.high)
        } else if third.high < first.low {
            (ZoneKind::Bearish, first.low, third.high)
        } else {
            return None;
        };

        if top - bottom < self.min_gap_size {
            return None;
        }

        match Zone::new(kind, top, bottom, third.timestamp, index) {
            Ok(zone) => Some(zone),
            Err(e) => {
                warn!("[DETECTOR] Rejected malformed zone candidate: {}", e);
                None
            }
        }
    }

    /// Batch scan over a full historical sequence, starting at index 2.
    pub fn scan(&self, bars: &[Bar]) -> Vec<Zone> {
        let mut zones = Vec::new();
        for index in 2..bars.len() {
            if let Some(zone) = self.detect(bars, index) {
                zones.push(zone);
            }
        }
        zones
    }
}
