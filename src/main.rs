// src/main.rs
use dotenv::dotenv;
use log::{error, info};
use tokio::sync::watch;

use fvg_detector::config::EngineConfig;
use fvg_detector::realtime::feed::{CsvBarFeed, CsvPriceFeed};
use fvg_detector::realtime::monitor::ZoneMonitor;
use fvg_detector::trading::signal_sink::CsvSignalSink;
use fvg_detector::trading::trade_history::TradeHistory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = EngineConfig::from_env();
    info!("Starting FVG zone monitor");
    info!(
        "  min gap: {:.2}pts, stale window: {} bars, tick: {:.2}",
        config.min_gap_size, config.stale_window_bars, config.price_tick_size
    );

    let historical_path = std::env::var("FVG_HISTORICAL_DATA_PATH")
        .unwrap_or_else(|_| "data/HistoricalData.csv".to_string());
    let live_feed_path =
        std::env::var("FVG_LIVE_FEED_PATH").unwrap_or_else(|_| "data/LiveFeed.csv".to_string());
    let signals_path =
        std::env::var("FVG_SIGNALS_PATH").unwrap_or_else(|_| "trade_signals.csv".to_string());
    let trades_log_path =
        std::env::var("FVG_TRADES_LOG_PATH").unwrap_or_else(|_| "trades_taken.csv".to_string());

    let bar_feed = CsvBarFeed::new(&historical_path);
    let price_feed = CsvPriceFeed::new(&live_feed_path);
    let sink = CsvSignalSink::new(&signals_path)?;
    let history = if config.cooldown_enabled {
        TradeHistory::with_file(&trades_log_path)?
    } else {
        TradeHistory::in_memory()
    };

    info!("  bars: {}, live feed: {}", historical_path, live_feed_path);
    info!("  signals: {}, trade history: {}", signals_path, trades_log_path);

    let mut monitor = ZoneMonitor::new(
        config,
        Box::new(bar_feed),
        Box::new(price_feed),
        Box::new(sink),
        history,
    );

    if let Err(e) = monitor.seed_from_history() {
        error!("Historical scan failed, starting with an empty registry: {}", e);
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested, shutting down...");
            let _ = stop_tx.send(true);
        }
    });

    monitor.run(stop_rx).await;
    Ok(())
}
