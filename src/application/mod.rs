//! Application-layer functionality built on top of the J1939 transport.
//!
//! Currently hosts [`dtc`], the bounded-memory DM1 active-fault monitor. See that module for
//! the full interface.
//!
//! # Examples
//!
//! ```
//! use j1939_dtc_monitor::application::dtc::DtcMonitor;
//!
//! let monitor = DtcMonitor::new();
//! monitor.process_dtc_frame(0x18FECA11, [0x00, 0x00, 1, 0, 5, 0, 0, 0], 1);
//! ```

pub mod dtc;
