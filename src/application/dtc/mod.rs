//! Bounded-memory SAE J1939 DM1 active-fault monitor.
//!
//! Tracks which Diagnostic Trouble Codes (DTCs) are currently active on a J1939 bus by
//! decoding DM1 (Active Diagnostic Trouble Codes, PGN 0xFECA) broadcasts, including ones
//! spread across a Transport Protocol BAM. Every table is a fixed-capacity array sized at
//! compile time; nothing on the ingest or maintenance path allocates.
//!
//! The pieces:
//! - [`classifier`] dispatches an incoming CAN identifier to a [`FrameClass`](classifier::FrameClass).
//! - [`reassembly`] reassembles BAM-fragmented DM1 broadcasts.
//! - [`dm1`] decodes a DM1 payload into individual fault records.
//! - [`tracker`] debounces sightings into candidate/active tables and ages them out.
//! - [`mutex`] is the non-blocking gate serializing the interrupt and tick paths.
//! - [`monitor`] wires the above into [`DtcMonitor`], the public entry point.
//! - [`singleton`] is a thin process-wide facade over [`DtcMonitor`] for call sites (vector
//!   tables) that need a bare function rather than a receiver.
//!
//! # Examples
//! ```
//! use j1939_dtc_monitor::application::dtc::{DtcMonitor, FilterConfig};
//!
//! let monitor = DtcMonitor::with_filtering(FilterConfig {
//!     active_read_count: 2,
//!     active_time_window: 10,
//!     inactive_timeout: 20,
//!     multi_frame_timeout: 5,
//! })?;
//!
//! // Called from the CAN RX interrupt, once per received frame:
//! monitor.process_dtc_frame(0x18FECA11, [0x00, 0x00, 100, 0, 1, 0, 0, 0], 1);
//! monitor.process_dtc_frame(0x18FECA11, [0x00, 0x00, 100, 0, 1, 0, 0, 0], 2);
//!
//! // Called once per second from the main loop:
//! if monitor.check_dtcs(2) {
//!     let dtcs = monitor.dynamic_copy_dtcs().unwrap();
//!     println!("{} active DTC(s)", dtcs.len());
//! }
//! # Ok::<(), j1939_dtc_monitor::error::DtcError>(())
//! ```

mod bounded;
mod classifier;
mod dm1;
mod monitor;
mod mutex;
mod reassembly;
mod record;
pub mod singleton;
mod tracker;


pub use monitor::DtcMonitor;
pub use reassembly::{MAX_CONCURRENT_MULTIFRAME, MAX_MULTIFRAME_DATA_SIZE};
pub use record::{LampStates, TrackedDtc};
pub use tracker::{MAX_ACTIVE_DTCS, MAX_CANDIDATE_DTCS};

use crate::error::{DtcError, Result};
use crate::types::{Config, Timestamp};

/// Debounce and aging tunables for [`DtcMonitor::set_dtc_filtering`] and
/// [`DtcMonitor::with_filtering`].
///
/// In [`DtcMonitor::set_dtc_filtering`] specifically, a value of `0` in any field means
/// "leave the current setting unchanged" rather than "zero", matching the monitor's
/// external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Local sightings required, within `active_time_window`, before a candidate is
    /// promoted to active.
    pub active_read_count: u16,
    /// Window, in seconds from first sighting, within which `active_read_count` sightings
    /// must occur for a candidate to be eligible for promotion.
    pub active_time_window: Timestamp,
    /// Seconds of inactivity after which an active DTC is aged out.
    pub inactive_timeout: Timestamp,
    /// Seconds after which an incomplete multi-frame reassembly slot is released.
    pub multi_frame_timeout: Timestamp,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            active_read_count: 10,
            active_time_window: 10,
            inactive_timeout: 20,
            multi_frame_timeout: 5,
        }
    }
}

impl Config for FilterConfig {
    fn validate(&self) -> Result<()> {
        if self.active_read_count == 0
            && self.active_time_window == 0
            && self.inactive_timeout == 0
            && self.multi_frame_timeout == 0
        {
            return Err(DtcError::InvalidParameter);
        }
        Ok(())
    }
}

#[cfg(test)]
mod filter_config_tests {
    use super::*;

    #[test]
    fn all_zero_config_is_rejected() {
        let config = FilterConfig {
            active_read_count: 0,
            active_time_window: 0,
            inactive_timeout: 0,
            multi_frame_timeout: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(FilterConfig::default().validate().is_ok());
    }
}
