// src/trading/trade_history.rs
// Persisted memory of emitted signals, read back by the traded-zone
// cooldown check so a restart does not re-trade the same gap.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::errors::SinkError;
use crate::types::{Direction, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub entry_price: f64,
    pub zone_bottom: f64,
    pub zone_top: f64,
}

#[derive(Debug, Default)]
pub struct TradeHistory {
    records: Vec<TradeRecord>,
    file_path: Option<PathBuf>,
}

impl TradeHistory {
    /// Volatile history, used when the cooldown check is disabled or in
    /// tests.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// CSV-backed history. Creates the file on first use and loads any
    /// prior records, skipping rows it cannot parse.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();

        if path.exists() {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(&path)?;
            for result in reader.deserialize::<TradeRecord>() {
                match result {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("[HISTORY] Skipping unreadable trade record: {}", e),
                }
            }
            info!("[HISTORY] Loaded {} past trade(s) from {:?}", records.len(), path);
        } else {
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record([
                "timestamp",
                "direction",
                "entry_price",
                "zone_bottom",
                "zone_top",
            ])?;
            writer.flush()?;
            info!("[HISTORY] Created trade history file {:?}", path);
        }

        Ok(Self {
            records,
            file_path: Some(path),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remember an emitted signal. Persistence is best-effort: the signal
    /// itself is already durable in the sink, so a history write failure
    /// only weakens the cooldown across restarts.
    pub fn record(&mut self, signal: &Signal) {
        let record = TradeRecord {
            timestamp: signal.timestamp,
            direction: signal.direction,
            entry_price: signal.entry_price,
            zone_bottom: signal.zone_bottom,
            zone_top: signal.zone_top,
        };

        if let Some(path) = &self.file_path {
            if let Err(e) = append_record(path, &record) {
                warn!("[HISTORY] Failed to persist trade record: {}", e);
            }
        }
        self.records.push(record);
    }

    /// Tolerance-based price-range match against past trades inside the
    /// cooldown window.
    pub fn recently_traded(
        &self,
        zone_bottom: f64,
        zone_top: f64,
        now: DateTime<Utc>,
        tolerance: f64,
        window: Duration,
    ) -> bool {
        self.records.iter().any(|r| {
            (r.zone_bottom - zone_bottom).abs() <= tolerance
                && (r.zone_top - zone_top).abs() <= tolerance
                && now.signed_duration_since(r.timestamp) < window
        })
    }
}

fn append_record(path: &Path, record: &TradeRecord) -> Result<(), SinkError> {
    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}
