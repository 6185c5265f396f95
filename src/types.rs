// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::EngineError;

/// A completed OHLC bar from the data feed. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Bullish,
    Bearish,
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneKind::Bullish => write!(f, "bullish"),
            ZoneKind::Bearish => write!(f, "bearish"),
        }
    }
}

/// A fair value gap zone. Price bounds are fixed at creation; only the
/// lifecycle flags move afterwards, and only one way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    id: String,
    kind: ZoneKind,
    top: f64,
    bottom: f64,
    created_at: DateTime<Utc>,
    created_at_bar_index: usize,
    filled: bool,
    trade_taken: bool,
}

impl Zone {
    pub fn new(
        kind: ZoneKind,
        top: f64,
        bottom: f64,
        created_at: DateTime<Utc>,
        created_at_bar_index: usize,
    ) -> Result<Self, EngineError> {
        if !top.is_finite() || !bottom.is_finite() || top <= bottom {
            return Err(EngineError::InvalidZoneBounds { top, bottom });
        }
        Ok(Self {
            id: generate_zone_id(kind, top, bottom, created_at),
            kind,
            top,
            bottom,
            created_at,
            created_at_bar_index,
            filled: false,
            trade_taken: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn gap_size(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_at_bar_index(&self) -> usize {
        self.created_at_bar_index
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    pub fn trade_taken(&self) -> bool {
        self.trade_taken
    }

    pub(crate) fn mark_filled(&mut self) {
        self.filled = true;
    }

    pub(crate) fn mark_trade_taken(&mut self) {
        self.trade_taken = true;
    }

    /// Inclusive zone membership, not mere proximity.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.bottom && price <= self.top
    }

    /// Half-open interval overlap against another zone's price range.
    pub fn overlaps(&self, other: &Zone) -> bool {
        !(self.bottom >= other.top || other.bottom >= self.top)
    }

    pub fn age_in_bars(&self, current_bar_index: usize) -> usize {
        current_bar_index.saturating_sub(self.created_at_bar_index)
    }
}

/// Deterministic zone id from the fields that identify the gap.
fn generate_zone_id(kind: ZoneKind, top: f64, bottom: f64, created_at: DateTime<Utc>) -> String {
    const PRECISION: usize = 8;

    let id_input = format!(
        "{}_{}_{:.prec$}_{:.prec$}",
        kind,
        created_at.to_rfc3339(),
        top,
        bottom,
        prec = PRECISION
    );

    let mut hasher = Sha256::new();
    hasher.update(id_input.as_bytes());
    let result = hasher.finalize();
    let hex_id = format!("{:x}", result);

    hex_id[..16].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// One (target price, quantity) pair of an exit plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalLeg {
    pub target_price: f64,
    pub quantity: u32,
}

/// A directional trade signal. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub legs: Vec<SignalLeg>,
    pub zone_bottom: f64,
    pub zone_top: f64,
    pub gap_size: f64,
    pub zone_kind: ZoneKind,
}
