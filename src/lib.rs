//! Bounded-memory SAE J1939 DM1 active-DTC tracker.
//!
//! See [`application::dtc`] for the monitor itself and [`application::dtc::singleton`] for the
//! process-wide free-function facade meant for interrupt vector tables.

pub mod application;

// Re-exports for convenience
pub use application::dtc;

// Common types and traits
pub mod error;
pub mod types;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
