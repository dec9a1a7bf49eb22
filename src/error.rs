//! Error types for the instrument registry and its producers

use thiserror::Error;

use crate::domain::ports::InstrumentKind;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while registering instruments or routing samples
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Registry Errors
    // =========================================================================
    /// A sample was submitted to a name that was never created
    #[error("{kind} instrument not registered: {name}")]
    InstrumentNotRegistered { kind: InstrumentKind, name: String },

    /// Label tuple does not line up with the declared label schema
    #[error("label cardinality mismatch for {name}: expected {expected} values, got {actual}")]
    LabelCardinality {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Sample value rejected by the instrument semantics
    #[error("invalid sample for {name}: {reason}")]
    InvalidSample { name: String, reason: String },

    // =========================================================================
    // Storage Engine Errors
    // =========================================================================
    /// Prometheus registration or lookup error
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Text exposition encoding failed
    #[error("Failed to encode metrics: {0}")]
    Encode(String),

    // =========================================================================
    // Environment / Configuration Errors
    // =========================================================================
    /// Node identity could not be resolved
    #[error("Failed to resolve hostname: {0}")]
    Hostname(#[source] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
