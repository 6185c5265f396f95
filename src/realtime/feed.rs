// src/realtime/feed.rs
// Input adapters. The engine sees traits; "new bar" detection is a
// timestamp comparison inside the adapter, never file metadata. Malformed
// rows are skipped with a warning - an input problem is "no update this
// cycle", not a crash.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::errors::FeedError;
use crate::types::Bar;

pub trait BarFeed {
    /// Bars that completed since the previous poll, oldest first.
    fn poll_new_bars(&mut self) -> Result<Vec<Bar>, FeedError>;
}

pub trait PriceFeed {
    /// Most recent trade price, if one is available.
    fn latest_price(&mut self) -> Result<Option<f64>, FeedError>;
}

fn parse_feed_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // The platform's export format
    NaiveDateTime::parse_from_str(raw, "%m/%d/%Y %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Append-only OHLC bar file (DateTime,Open,High,Low,Close).
pub struct CsvBarFeed {
    path: PathBuf,
    last_processed: Option<DateTime<Utc>>,
}

impl CsvBarFeed {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_processed: None,
        }
    }
}

impl BarFeed for CsvBarFeed {
    fn poll_new_bars(&mut self) -> Result<Vec<Bar>, FeedError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let mut bars = Vec::new();
        for result in reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("[BAR_FEED] Skipping unreadable row: {}", e);
                    continue;
                }
            };
            if record.len() < 5 {
                continue;
            }

            let timestamp = match parse_feed_timestamp(record[0].trim()) {
                Some(ts) => ts,
                None => {
                    warn!("[BAR_FEED] Skipping row with bad timestamp '{}'", &record[0]);
                    continue;
                }
            };
            let (open, high, low, close) = match (
                record[1].trim().parse::<f64>(),
                record[2].trim().parse::<f64>(),
                record[3].trim().parse::<f64>(),
                record[4].trim().parse::<f64>(),
            ) {
                (Ok(o), Ok(h), Ok(l), Ok(c)) => (o, h, l, c),
                _ => {
                    warn!("[BAR_FEED] Skipping row with unparseable prices at {}", timestamp);
                    continue;
                }
            };

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        if let Some(last) = self.last_processed {
            bars.retain(|b| b.timestamp > last);
        }
        if let Some(newest) = bars.last() {
            self.last_processed = Some(newest.timestamp);
            debug!("[BAR_FEED] {} new bar(s), latest {}", bars.len(), newest.timestamp);
        }

        Ok(bars)
    }
}

/// Live tick file (DateTime,Last); only the last row matters.
pub struct CsvPriceFeed {
    path: PathBuf,
}

impl CsvPriceFeed {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PriceFeed for CsvPriceFeed {
    fn latest_price(&mut self) -> Result<Option<f64>, FeedError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let headers = reader.headers()?.clone();
        let last_column = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("last"))
            .unwrap_or(headers.len().saturating_sub(1));

        let mut latest = None;
        for result in reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("[PRICE_FEED] Skipping unreadable row: {}", e);
                    continue;
                }
            };
            if let Some(raw) = record.get(last_column) {
                match raw.trim().parse::<f64>() {
                    Ok(price) if price.is_finite() && price > 0.0 => latest = Some(price),
                    _ => debug!("[PRICE_FEED] Ignoring unparseable price '{}'", raw),
                }
            }
        }

        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("fvg_feed_test_{}_{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_bar_feed_returns_only_unseen_bars() {
        let path = temp_file(
            "bars.csv",
            "DateTime,Open,High,Low,Close\n\
             03/01/2024 09:00:00,10.0,11.0,9.5,10.5\n\
             03/01/2024 10:00:00,10.5,12.0,10.0,11.5\n",
        );
        let mut feed = CsvBarFeed::new(&path);

        let first = feed.poll_new_bars().unwrap();
        assert_eq!(first.len(), 2);

        // Nothing new on an unchanged file
        assert!(feed.poll_new_bars().unwrap().is_empty());

        // Append one bar; only it comes back
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"03/01/2024 11:00:00,11.5,13.0,11.0,12.5\n")
            .unwrap();
        let third = feed.poll_new_bars().unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].close, 12.5);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bar_feed_skips_malformed_rows() {
        let path = temp_file(
            "bad_bars.csv",
            "DateTime,Open,High,Low,Close\n\
             not-a-date,10.0,11.0,9.5,10.5\n\
             03/01/2024 10:00:00,oops,12.0,10.0,11.5\n\
             03/01/2024 11:00:00,11.5,13.0,11.0,12.5\n",
        );
        let mut feed = CsvBarFeed::new(&path);

        let bars = feed.poll_new_bars().unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 12.5);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_bar_file_is_no_update() {
        let mut feed = CsvBarFeed::new("/nonexistent/fvg/bars.csv");
        assert!(feed.poll_new_bars().unwrap().is_empty());
    }

    #[test]
    fn test_price_feed_takes_last_row() {
        let path = temp_file(
            "prices.csv",
            "DateTime,Last\n\
             03/01/2024 09:00:01,10.25\n\
             03/01/2024 09:00:02,10.50\n\
             03/01/2024 09:00:03,10.75\n",
        );
        let mut feed = CsvPriceFeed::new(&path);

        assert_eq!(feed.latest_price().unwrap(), Some(10.75));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_price_feed_ignores_garbage_tail() {
        let path = temp_file(
            "garbage_prices.csv",
            "DateTime,Last\n\
             03/01/2024 09:00:01,10.25\n\
             03/01/2024 09:00:02,NaN\n",
        );
        let mut feed = CsvPriceFeed::new(&path);

        // NaN is rejected by the sanity check; the prior price stands
        assert_eq!(feed.latest_price().unwrap(), Some(10.25));

        std::fs::remove_file(&path).ok();
    }
}
