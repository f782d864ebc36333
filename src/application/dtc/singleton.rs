//! Process-wide facade matching the monitor's literal free-function interface, for call
//! sites — typically a vectored interrupt table — that need a bare function rather than a
//! `&DtcMonitor` receiver.
//!
//! Prefer constructing your own [`DtcMonitor`] (one per CAN channel, trivially testable in
//! isolation) and calling its methods directly; reach for this module only when the call
//! site genuinely cannot carry one.

use std::sync::OnceLock;

use crate::types::{CanId, Timestamp};

use super::{DtcMonitor, TrackedDtc};

static MONITOR: OnceLock<DtcMonitor> = OnceLock::new();

fn monitor() -> &'static DtcMonitor {
    MONITOR.get_or_init(DtcMonitor::new)
}

/// See [`DtcMonitor::process_dtc_frame`].
pub fn process_dtc_frame(can_id: CanId, data: [u8; 8], ts: Timestamp) {
    monitor().process_dtc_frame(can_id, data, ts)
}

/// See [`DtcMonitor::check_dtcs`].
pub fn check_dtcs(ts: Timestamp) -> bool {
    monitor().check_dtcs(ts)
}

/// See [`DtcMonitor::set_dtc_filtering`].
pub fn set_dtc_filtering(
    active_read_count: u16,
    active_time_window: Timestamp,
    inactive_timeout: Timestamp,
    multi_frame_timeout: Timestamp,
) {
    monitor().set_dtc_filtering(
        active_read_count,
        active_time_window,
        inactive_timeout,
        multi_frame_timeout,
    )
}

/// See [`DtcMonitor::register_dtc_updated_callback`].
pub fn register_dtc_updated_callback(callback: Option<fn(&[TrackedDtc])>) {
    monitor().register_dtc_updated_callback(callback)
}

/// See [`DtcMonitor::copy_dtcs`].
pub fn copy_dtcs(buf: &mut [TrackedDtc]) -> Option<usize> {
    monitor().copy_dtcs(buf)
}

/// See [`DtcMonitor::dynamic_copy_dtcs`].
pub fn dynamic_copy_dtcs() -> Option<Vec<TrackedDtc>> {
    monitor().dynamic_copy_dtcs()
}

/// See [`DtcMonitor::get_reference_to_dtcs`].
///
/// # Safety
/// Same contract as [`DtcMonitor::get_reference_to_dtcs`]: the caller must already hold the
/// gate, via [`take_dtc_mutex`], for the entire lifetime of the returned slice.
pub unsafe fn get_reference_to_dtcs() -> &'static [TrackedDtc] {
    unsafe { monitor().get_reference_to_dtcs() }
}

/// See [`DtcMonitor::take_dtc_mutex`].
pub fn take_dtc_mutex() -> bool {
    monitor().take_dtc_mutex()
}

/// See [`DtcMonitor::give_dtc_mutex`].
pub fn give_dtc_mutex() {
    monitor().give_dtc_mutex()
}

/// See [`DtcMonitor::clear_dtcs`].
pub fn clear_dtcs() {
    monitor().clear_dtcs()
}
