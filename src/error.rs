use thiserror::Error;

/// Crate-wide result alias; every public, fallible entry point returns this.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load config '{path}': {reason}")]
    Config { path: String, reason: String },

    #[error("FlowKey out of range: pos {pos}, len {len}, total_len {total_len}")]
    FlowKeyOutOfRange {
        pos: usize,
        len: usize,
        total_len: usize,
    },

    #[error("Bloom filter dimension mismatch: {reason}")]
    DimensionMismatch { reason: String },

    #[error("I/O error reading trace file '{path}': {source}")]
    TraceIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
