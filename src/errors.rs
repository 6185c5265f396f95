// src/errors.rs
use thiserror::Error;

/// Errors at the input boundary. A feed error means "no update this
/// cycle", never a crashed loop.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("feed CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed feed record: {0}")]
    Malformed(String),
}

/// Errors at the output boundary. A failed write must be visible to the
/// caller so the trade-taken transition can be withheld.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid zone bounds: top {top} <= bottom {bottom}")]
    InvalidZoneBounds { top: f64, bottom: f64 },
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}
