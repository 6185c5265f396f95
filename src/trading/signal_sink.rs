// src/trading/signal_sink.rs
// Where emitted signals go. The engine only ever sees the trait; the CSV
// implementation matches the execution platform's signal file contract.

use log::info;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::errors::SinkError;
use crate::types::Signal;

pub trait SignalSink {
    /// Durably record one signal. An Err here means the signal was NOT
    /// recorded and the caller must not treat the zone as traded.
    fn record(&mut self, signal: &Signal) -> Result<(), SinkError>;
}

const SIGNAL_HEADERS: [&str; 13] = [
    "DateTime",
    "Signal",
    "Direction",
    "Entry_Price",
    "Stop_Loss",
    "Target_1",
    "Quantity_1",
    "Target_2",
    "Quantity_2",
    "Zone_Bottom",
    "Zone_Top",
    "Zone_Type",
    "Gap_Size",
];

/// Append-only CSV signal file, header written on create.
pub struct CsvSignalSink {
    path: PathBuf,
}

impl CsvSignalSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(SIGNAL_HEADERS)?;
            writer.flush()?;
            info!("[SINK] Created signal file {:?}", path);
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SignalSink for CsvSignalSink {
    fn record(&mut self, signal: &Signal) -> Result<(), SinkError> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let first_leg = signal.legs.first();
        let second_leg = signal.legs.get(1);

        writer.write_record([
            signal.timestamp.format("%m/%d/%Y %H:%M:%S").to_string(),
            "FVG_RETEST".to_string(),
            signal.direction.to_string(),
            format!("{:.2}", signal.entry_price),
            format!("{:.2}", signal.stop_loss),
            first_leg
                .map(|l| format!("{:.2}", l.target_price))
                .unwrap_or_default(),
            first_leg.map(|l| l.quantity.to_string()).unwrap_or_default(),
            second_leg
                .map(|l| format!("{:.2}", l.target_price))
                .unwrap_or_default(),
            second_leg.map(|l| l.quantity.to_string()).unwrap_or_default(),
            format!("{:.2}", signal.zone_bottom),
            format!("{:.2}", signal.zone_top),
            signal.zone_kind.to_string(),
            format!("{:.2}", signal.gap_size),
        ])?;
        writer.flush()?;

        info!(
            "[SINK] Signal written: {} @ {:.2}",
            signal.direction, signal.entry_price
        );
        Ok(())
    }
}

/// In-memory sink for tests and dry runs. `fail_writes` simulates an
/// unavailable downstream so the trade-taken ordering can be exercised.
#[derive(Debug, Default)]
pub struct MemorySignalSink {
    pub signals: Vec<Signal>,
    pub fail_writes: bool,
}

impl MemorySignalSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSink for MemorySignalSink {
    fn record(&mut self, signal: &Signal) -> Result<(), SinkError> {
        if self.fail_writes {
            return Err(SinkError::Unavailable(
                "memory sink set to fail".to_string(),
            ));
        }
        self.signals.push(signal.clone());
        Ok(())
    }
}
