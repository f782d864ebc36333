use std::cell::UnsafeCell;

use crate::error::Result;
use crate::types::{CanId, Config, Timestamp};

use super::classifier::{classify, FrameClass};
use super::dm1;
use super::mutex::MutexGate;
use super::reassembly::Reassembler;
use super::record::TrackedDtc;
use super::tracker::DtcTracker;
use super::FilterConfig;

struct Inner {
    tracker: DtcTracker,
    reassembler: Reassembler,
    callback: Option<fn(&[TrackedDtc])>,
}

impl Inner {
    fn new() -> Self {
        Self {
            tracker: DtcTracker::new(),
            reassembler: Reassembler::new(),
            callback: None,
        }
    }
}

/// Owns the candidate/active DTC tables, the multi-frame reassembly slot pool, and the mutex
/// gate serializing access between the CAN RX interrupt and the periodic maintenance tick.
///
/// # Safety model
/// The gate, not the borrow checker, is what proves exclusivity between the ISR ingest path
/// and the main-loop tick path, so the public methods here take `&self` and reach through an
/// internal [`UnsafeCell`] once the gate is held. This mirrors the target hardware (one core,
/// one CAN interrupt, one main loop) rather than pretending a `&mut DtcMonitor` could ever be
/// threaded through a vector table.
///
/// # Examples
/// ```
/// use j1939_dtc_monitor::application::dtc::DtcMonitor;
///
/// let monitor = DtcMonitor::new();
/// // header: all lamps off; record: spn=100, fmi=1, cm=0, oc=1
/// let frame = [0x00, 0x00, 0x64, 0x00, 0x01, 0x01, 0x00, 0x00];
/// monitor.process_dtc_frame(0x18FECA00, frame, 1);
/// monitor.check_dtcs(1);
/// ```
pub struct DtcMonitor {
    gate: MutexGate,
    inner: UnsafeCell<Inner>,
}

// Safety: every access to `inner` is preceded by a successful `gate.try_acquire()`, except
// `get_reference_to_dtcs`, whose contract documents that the caller must already hold the
// gate. `Inner` is therefore never observed from two call sites at once.
unsafe impl Sync for DtcMonitor {}

impl Default for DtcMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DtcMonitor {
    /// Creates a monitor with the default filtering (10 occurrences within a 10 second
    /// window to promote, 20 seconds of inactivity to age out, 5 second multi-frame timeout).
    pub fn new() -> Self {
        Self {
            gate: MutexGate::new(),
            inner: UnsafeCell::new(Inner::new()),
        }
    }

    /// Creates a monitor with an explicit, validated [`FilterConfig`].
    pub fn with_filtering(config: FilterConfig) -> Result<Self> {
        config.validate()?;
        let monitor = Self::new();
        // Safety: `monitor` is not yet shared, so no concurrent access is possible.
        let inner = unsafe { &mut *monitor.inner.get() };
        inner.tracker.set_filtering(
            config.active_read_count,
            config.active_time_window,
            config.inactive_timeout,
        );
        inner.reassembler.set_timeout(config.multi_frame_timeout);
        Ok(monitor)
    }

    /// Ingests one CAN frame. Callable from the CAN RX interrupt.
    ///
    /// If the mutex gate is already held by a concurrent tick or snapshot read, the frame is
    /// dropped silently: stability takes priority over completeness on the ingest path.
    pub fn process_dtc_frame(&self, can_id: CanId, data: [u8; 8], ts: Timestamp) {
        let Some(_guard) = self.gate.acquire() else {
            log::trace!("mutex gate held, dropping frame 0x{can_id:08X}");
            return;
        };
        // Safety: the guard above proves exclusive access for its lifetime.
        let inner = unsafe { &mut *self.inner.get() };
        match classify(can_id, &data) {
            FrameClass::Dm1SingleFrame => dm1::parse(can_id, &data, ts, &mut inner.tracker),
            FrameClass::TransportConnectionManagement => {
                inner.reassembler.handle_announcement(can_id, &data, ts)
            }
            FrameClass::TransportDataTransfer => {
                inner
                    .reassembler
                    .handle_fragment(can_id, &data, ts, &mut inner.tracker)
            }
            FrameClass::Unrelated => {}
        }
    }

    /// Ages candidates, active DTCs and multi-frame slots, and notifies the subscriber if the
    /// active set changed. Must be called at least once per second. Returns whether the
    /// active set changed; returns `false` (without aging anything) if the gate is contended.
    pub fn check_dtcs(&self, ts: Timestamp) -> bool {
        let Some(_guard) = self.gate.acquire() else {
            log::trace!("mutex gate held, skipping maintenance tick at ts={ts}");
            return false;
        };
        let inner = unsafe { &mut *self.inner.get() };
        inner.tracker.age(ts);
        inner.reassembler.age(ts);

        if inner.tracker.take_changed() {
            if let Some(callback) = inner.callback {
                callback(inner.tracker.active_dtcs());
            }
            true
        } else {
            false
        }
    }

    /// Updates the debounce/aging windows. A value of `0` in any field leaves the
    /// corresponding setting unchanged.
    pub fn set_dtc_filtering(
        &self,
        active_read_count: u16,
        active_time_window: Timestamp,
        inactive_timeout: Timestamp,
        multi_frame_timeout: Timestamp,
    ) {
        let Some(_guard) = self.gate.acquire() else {
            log::warn!("mutex gate held, filtering update dropped");
            return;
        };
        let inner = unsafe { &mut *self.inner.get() };
        inner
            .tracker
            .set_filtering(active_read_count, active_time_window, inactive_timeout);
        inner.reassembler.set_timeout(multi_frame_timeout);
    }

    /// Registers (or clears, with `None`) the single subscriber notified when the active set
    /// changes. A plain function pointer, not a boxed closure: this type must stay usable
    /// with nothing resembling an allocator nearby.
    pub fn register_dtc_updated_callback(&self, callback: Option<fn(&[TrackedDtc])>) {
        match self.gate.acquire() {
            Some(_guard) => {
                let inner = unsafe { &mut *self.inner.get() };
                inner.callback = callback;
            }
            None => log::warn!("mutex gate held, callback registration dropped"),
        }
    }

    /// Copies the current active DTCs into `buf`, returning the count copied. Returns `None`
    /// if `buf` is too small to hold them all, or if the gate is contended.
    pub fn copy_dtcs(&self, buf: &mut [TrackedDtc]) -> Option<usize> {
        let _guard = self.gate.acquire()?;
        let inner = unsafe { &mut *self.inner.get() };
        let active = inner.tracker.active_dtcs();
        if buf.len() < active.len() {
            return None;
        }
        buf[..active.len()].copy_from_slice(active);
        Some(active.len())
    }

    /// Returns a heap-allocated copy of the current active DTCs, or `None` if the gate is
    /// contended. The only allocation anywhere in this crate: meant for off-target tooling
    /// and tests, never the interrupt or tick path.
    pub fn dynamic_copy_dtcs(&self) -> Option<Vec<TrackedDtc>> {
        let _guard = self.gate.acquire()?;
        let inner = unsafe { &mut *self.inner.get() };
        Some(inner.tracker.active_dtcs().to_vec())
    }

    /// Returns a reference to the active DTC table without acquiring the gate itself.
    ///
    /// # Safety
    /// The caller must already hold the gate (via [`DtcMonitor::take_dtc_mutex`]) for the
    /// entire lifetime of the returned slice. Without that, a concurrent ISR ingest could
    /// mutate the table the slice points into.
    pub unsafe fn get_reference_to_dtcs(&self) -> &[TrackedDtc] {
        let inner = unsafe { &*self.inner.get() };
        inner.tracker.active_dtcs()
    }

    /// Non-blocking gate acquire, for callers holding it across several calls (for example
    /// around [`DtcMonitor::get_reference_to_dtcs`]). Returns `false` if already held.
    pub fn take_dtc_mutex(&self) -> bool {
        self.gate.try_acquire()
    }

    /// Releases the gate taken by [`DtcMonitor::take_dtc_mutex`].
    pub fn give_dtc_mutex(&self) {
        self.gate.release();
    }

    /// Clears the candidate, active, and multi-frame slot tables.
    pub fn clear_dtcs(&self) {
        let Some(_guard) = self.gate.acquire() else {
            log::warn!("mutex gate held, clear_dtcs dropped");
            return;
        };
        let inner = unsafe { &mut *self.inner.get() };
        inner.tracker.clear();
        inner.reassembler.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dm1_frame(spn: u32, fmi: u8) -> [u8; 8] {
        let b0 = (spn & 0xFF) as u8;
        let b1 = ((spn >> 8) & 0xFF) as u8;
        let b2 = (((spn >> 16) & 0x7) as u8) << 5 | (fmi & 0x1F);
        [0x00, 0x00, b0, b1, b2, 0x00, 0x00, 0x00]
    }

    #[test]
    fn promotes_and_reports_through_callback() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn on_update(_active: &[TrackedDtc]) {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }

        let monitor = DtcMonitor::with_filtering(FilterConfig {
            active_read_count: 2,
            active_time_window: 10,
            inactive_timeout: 20,
            multi_frame_timeout: 5,
        })
        .unwrap();
        monitor.register_dtc_updated_callback(Some(on_update));

        monitor.process_dtc_frame(0x18FECA11, dm1_frame(200, 3), 1);
        monitor.process_dtc_frame(0x18FECA11, dm1_frame(200, 3), 2);
        assert!(monitor.check_dtcs(2));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);

        let mut buf = [TrackedDtc::default(); 4];
        let count = monitor.copy_dtcs(&mut buf).unwrap();
        assert_eq!(count, 1);
        assert_eq!(buf[0].spn, 200);
        assert_eq!(buf[0].fmi, 3);
    }

    #[test]
    fn held_gate_drops_frames_silently() {
        let monitor = DtcMonitor::new();
        assert!(monitor.take_dtc_mutex());
        monitor.process_dtc_frame(0x18FECA11, dm1_frame(200, 3), 1);
        monitor.give_dtc_mutex();
        assert_eq!(monitor.dynamic_copy_dtcs().unwrap().len(), 0);
    }

    #[test]
    fn clear_dtcs_empties_active_set() {
        let monitor = DtcMonitor::with_filtering(FilterConfig {
            active_read_count: 1,
            active_time_window: 10,
            inactive_timeout: 20,
            multi_frame_timeout: 5,
        })
        .unwrap();
        monitor.process_dtc_frame(0x18FECA11, dm1_frame(200, 3), 1);
        assert_eq!(monitor.dynamic_copy_dtcs().unwrap().len(), 1);
        monitor.clear_dtcs();
        assert_eq!(monitor.dynamic_copy_dtcs().unwrap().len(), 0);
    }

    #[test]
    fn take_and_give_mutex_round_trip_guards_reference_read() {
        let monitor = DtcMonitor::with_filtering(FilterConfig {
            active_read_count: 1,
            active_time_window: 10,
            inactive_timeout: 20,
            multi_frame_timeout: 5,
        })
        .unwrap();
        monitor.process_dtc_frame(0x18FECA11, dm1_frame(200, 3), 1);
        assert!(monitor.take_dtc_mutex());
        // Safety: gate held by the line above for the duration of this borrow.
        let dtcs = unsafe { monitor.get_reference_to_dtcs() };
        assert_eq!(dtcs.len(), 1);
        monitor.give_dtc_mutex();
    }
}
