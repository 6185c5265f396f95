// src/config.rs
// Engine configuration. Everything tunable lives here; the core modules
// never read the environment themselves.

use log::warn;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitMode {
    /// Two legs: a fixed-points partial exit plus a runner at the far
    /// zone boundary.
    Partial,
    /// One leg at the far zone boundary with the full quantity.
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Stop distance is max(fixed floor, gap size).
    GapDerived,
    /// Stop distance is the fixed floor regardless of gap size.
    FixedPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Overlapping same-kind zones resolve to the tighter gap.
    KeepSmaller,
    /// First zone in wins; overlapping candidates are discarded.
    KeepExisting,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum gap size in points for a 3-bar pattern to become a zone.
    pub min_gap_size: f64,
    /// Zones older than this many bars are evicted unfilled.
    pub stale_window_bars: usize,
    /// Floor for the stop distance in points.
    pub fixed_stop_floor: f64,
    /// Distance of the first profit target from entry, in points.
    pub partial_exit_points: f64,
    /// Signals whose first-target profit is below this are rejected.
    pub min_profit_target_points: f64,
    /// A zone matching a past trade within this window is not re-traded.
    pub cooldown_minutes: i64,
    pub cooldown_enabled: bool,
    /// Price-range tolerance for matching a zone against trade history.
    pub match_tolerance: f64,
    /// Venue minimum price increment; all derived prices snap to it.
    pub price_tick_size: f64,
    pub quantity_first_leg: u32,
    pub quantity_runner: u32,
    pub exit_mode: ExitMode,
    pub stop_mode: StopMode,
    pub dedup_policy: DedupPolicy,
    pub poll_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_gap_size: 2.5,
            stale_window_bars: 100,
            fixed_stop_floor: 10.0,
            partial_exit_points: 5.0,
            min_profit_target_points: 3.0,
            cooldown_minutes: 60,
            cooldown_enabled: true,
            match_tolerance: 0.5,
            price_tick_size: 0.25,
            quantity_first_leg: 8,
            quantity_runner: 4,
            exit_mode: ExitMode::Partial,
            stop_mode: StopMode::GapDerived,
            dedup_policy: DedupPolicy::KeepSmaller,
            poll_interval_secs: 1,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let min_gap_size = env::var("FVG_MIN_GAP_SIZE")
            .unwrap_or_else(|_| "2.5".to_string())
            .parse::<f64>()
            .unwrap_or(defaults.min_gap_size);

        let stale_window_bars = env::var("FVG_STALE_WINDOW_BARS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<usize>()
            .unwrap_or(defaults.stale_window_bars);

        let fixed_stop_floor = env::var("FVG_FIXED_STOP_FLOOR")
            .unwrap_or_else(|_| "10.0".to_string())
            .parse::<f64>()
            .unwrap_or(defaults.fixed_stop_floor);

        let partial_exit_points = env::var("FVG_PARTIAL_EXIT_POINTS")
            .unwrap_or_else(|_| "5.0".to_string())
            .parse::<f64>()
            .unwrap_or(defaults.partial_exit_points);

        let min_profit_target_points = env::var("FVG_MIN_PROFIT_TARGET_POINTS")
            .unwrap_or_else(|_| "3.0".to_string())
            .parse::<f64>()
            .unwrap_or(defaults.min_profit_target_points);

        let cooldown_minutes = env::var("FVG_COOLDOWN_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<i64>()
            .unwrap_or(defaults.cooldown_minutes);

        let cooldown_enabled = env::var("FVG_COOLDOWN_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .trim()
            .to_lowercase()
            == "true";

        let match_tolerance = env::var("FVG_MATCH_TOLERANCE")
            .unwrap_or_else(|_| "0.5".to_string())
            .parse::<f64>()
            .unwrap_or(defaults.match_tolerance);

        let price_tick_size = env::var("FVG_PRICE_TICK_SIZE")
            .unwrap_or_else(|_| "0.25".to_string())
            .parse::<f64>()
            .unwrap_or(defaults.price_tick_size);

        let quantity_first_leg = env::var("FVG_QUANTITY_FIRST_LEG")
            .unwrap_or_else(|_| "8".to_string())
            .parse::<u32>()
            .unwrap_or(defaults.quantity_first_leg);

        let quantity_runner = env::var("FVG_QUANTITY_RUNNER")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<u32>()
            .unwrap_or(defaults.quantity_runner);

        let exit_mode = match env::var("FVG_EXIT_MODE")
            .unwrap_or_else(|_| "partial".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "partial" => ExitMode::Partial,
            "single" => ExitMode::Single,
            other => {
                warn!("[CONFIG] Unknown FVG_EXIT_MODE '{}', using partial exits", other);
                ExitMode::Partial
            }
        };

        let stop_mode = match env::var("FVG_STOP_MODE")
            .unwrap_or_else(|_| "gap_derived".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "gap_derived" => StopMode::GapDerived,
            "fixed" => StopMode::FixedPoints,
            other => {
                warn!("[CONFIG] Unknown FVG_STOP_MODE '{}', using gap-derived stops", other);
                StopMode::GapDerived
            }
        };

        let dedup_policy = match env::var("FVG_DEDUP_POLICY")
            .unwrap_or_else(|_| "keep_smaller".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "keep_smaller" => DedupPolicy::KeepSmaller,
            "keep_existing" => DedupPolicy::KeepExisting,
            other => {
                warn!("[CONFIG] Unknown FVG_DEDUP_POLICY '{}', keeping smaller zones", other);
                DedupPolicy::KeepSmaller
            }
        };

        let poll_interval_secs = env::var("FVG_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<u64>()
            .unwrap_or(defaults.poll_interval_secs)
            .max(1);

        Self {
            min_gap_size,
            stale_window_bars,
            fixed_stop_floor,
            partial_exit_points,
            min_profit_target_points,
            cooldown_minutes,
            cooldown_enabled,
            match_tolerance,
            price_tick_size,
            quantity_first_leg,
            quantity_runner,
            exit_mode,
            stop_mode,
            dedup_policy,
            poll_interval_secs,
        }
    }

    /// Full position size when the exit plan is a single leg.
    pub fn total_quantity(&self) -> u32 {
        self.quantity_first_leg + self.quantity_runner
    }
}
