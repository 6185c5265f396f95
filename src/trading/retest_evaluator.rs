// src/trading/retest_evaluator.rs
// Retest detection and risk derivation. A bullish gap retested from
// above is faded short; a bearish gap retested from below is bought.
// Each zone trades at most once: the trade-taken flag transitions on
// rejection immediately, on emission only after the sink accepts.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, ExitMode, StopMode};
use crate::trading::signal_sink::SignalSink;
use crate::trading::trade_history::TradeHistory;
use crate::types::{Direction, Signal, SignalLeg, Zone, ZoneKind};
use crate::zones::registry::ZoneRegistry;

/// Snap a price to the venue's minimum increment.
pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    (price / tick).round() * tick
}

enum Decision {
    Emit { zone_id: String, signal: Signal },
    Reject { zone_id: String, reason: String },
}

pub struct RetestEvaluator {
    config: EngineConfig,
}

impl RetestEvaluator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Run one retest pass at the current live price. Returns the signals
    /// durably recorded this pass (several zones can contain one tick).
    pub fn evaluate(
        &self,
        registry: &mut ZoneRegistry,
        history: &mut TradeHistory,
        sink: &mut dyn SignalSink,
        live_price: f64,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        let decisions: Vec<Decision> = registry
            .active()
            .filter(|z| !z.trade_taken() && z.contains(live_price))
            .map(|zone| self.decide(zone, history, live_price, now))
            .collect();

        let mut emitted = Vec::new();
        for decision in decisions {
            match decision {
                Decision::Reject { zone_id, reason } => {
                    info!("[EVALUATOR] Zone {} rejected: {}", zone_id, reason);
                    registry.mark_trade_taken(&zone_id);
                }
                Decision::Emit { zone_id, signal } => match sink.record(&signal) {
                    Ok(()) => {
                        info!(
                            "[EVALUATOR] {} SIGNAL: entry {:.2}, stop {:.2}, {} leg(s)",
                            signal.direction,
                            signal.entry_price,
                            signal.stop_loss,
                            signal.legs.len()
                        );
                        registry.mark_trade_taken(&zone_id);
                        history.record(&signal);
                        emitted.push(signal);
                    }
                    Err(e) => {
                        // Zone stays eligible; the write retries on the
                        // next qualifying tick.
                        warn!("[EVALUATOR] Signal for zone {} not recorded: {}", zone_id, e);
                    }
                },
            }
        }
        emitted
    }

    fn decide(
        &self,
        zone: &Zone,
        history: &TradeHistory,
        live_price: f64,
        now: DateTime<Utc>,
    ) -> Decision {
        let zone_id = zone.id().to_string();

        if self.config.cooldown_enabled
            && history.recently_traded(
                zone.bottom(),
                zone.top(),
                now,
                self.config.match_tolerance,
                Duration::minutes(self.config.cooldown_minutes),
            )
        {
            return Decision::Reject {
                zone_id,
                reason: format!(
                    "zone traded within the last {} minutes",
                    self.config.cooldown_minutes
                ),
            };
        }

        let direction = match zone.kind() {
            ZoneKind::Bullish => Direction::Short,
            ZoneKind::Bearish => Direction::Long,
        };

        let tick = self.config.price_tick_size;
        let entry_price = round_to_tick(live_price, tick);

        let stop_distance = match self.config.stop_mode {
            StopMode::GapDerived => self.config.fixed_stop_floor.max(zone.gap_size()),
            StopMode::FixedPoints => self.config.fixed_stop_floor,
        };

        let (stop_loss, boundary_target) = match direction {
            Direction::Long => (
                round_to_tick(zone.bottom() - stop_distance, tick),
                round_to_tick(zone.top(), tick),
            ),
            Direction::Short => (
                round_to_tick(zone.top() + stop_distance, tick),
                round_to_tick(zone.bottom(), tick),
            ),
        };

        let legs = match self.config.exit_mode {
            ExitMode::Partial => {
                let first_target = match direction {
                    Direction::Long => entry_price + self.config.partial_exit_points,
                    Direction::Short => entry_price - self.config.partial_exit_points,
                };
                vec![
                    SignalLeg {
                        target_price: round_to_tick(first_target, tick),
                        quantity: self.config.quantity_first_leg,
                    },
                    SignalLeg {
                        target_price: boundary_target,
                        quantity: self.config.quantity_runner,
                    },
                ]
            }
            ExitMode::Single => vec![SignalLeg {
                target_price: boundary_target,
                quantity: self.config.total_quantity(),
            }],
        };

        let first_target = legs[0].target_price;
        let potential_profit = match direction {
            Direction::Long => first_target - entry_price,
            Direction::Short => entry_price - first_target,
        };
        if potential_profit < self.config.min_profit_target_points {
            return Decision::Reject {
                zone_id,
                reason: format!(
                    "potential profit {:.2} below minimum {:.2}",
                    potential_profit, self.config.min_profit_target_points
                ),
            };
        }

        Decision::Emit {
            zone_id,
            signal: Signal {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                direction,
                entry_price,
                stop_loss,
                legs,
                zone_bottom: zone.bottom(),
                zone_top: zone.top(),
                gap_size: zone.gap_size(),
                zone_kind: zone.kind(),
            },
        }
    }
}
