//! Error types for the DTC monitor.
//!
//! The hot paths (frame ingest, periodic tick) never return an error: contention, malformed
//! payloads, and capacity exhaustion are all silently absorbed so that liveness is never
//! sacrificed for completeness. This type exists for the one call site that can meaningfully
//! fail: validating a [`crate::types::Config`] before it is applied.

use std::error::Error;
use std::fmt;

/// Represents the error conditions the DTC monitor's configuration surface can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtcError {
    /// A filtering parameter was out of the range the tracker can represent.
    InvalidParameter,
}

impl fmt::Display for DtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtcError::InvalidParameter => write!(f, "invalid parameter"),
        }
    }
}

impl Error for DtcError {}

/// A specialized Result type for DTC monitor configuration operations.
pub type Result<T> = std::result::Result<T, DtcError>;
