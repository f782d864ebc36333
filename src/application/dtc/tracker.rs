use crate::types::Timestamp;

use super::bounded::BoundedList;
use super::record::{LampStates, TrackedDtc};

/// Maximum number of DTCs awaiting promotion at once.
pub const MAX_CANDIDATE_DTCS: usize = 40;

/// Maximum number of simultaneously active DTCs.
pub const MAX_ACTIVE_DTCS: usize = 20;

/// Holds the candidate and active DTC tables and drives debounce, promotion and aging.
pub(crate) struct DtcTracker {
    candidates: BoundedList<TrackedDtc, MAX_CANDIDATE_DTCS>,
    active: BoundedList<TrackedDtc, MAX_ACTIVE_DTCS>,
    changed: bool,
    active_read_count: u16,
    active_time_window: Timestamp,
    inactive_timeout: Timestamp,
}

impl DtcTracker {
    pub(crate) fn new() -> Self {
        Self {
            candidates: BoundedList::new(),
            active: BoundedList::new(),
            changed: false,
            active_read_count: 10,
            active_time_window: 10,
            inactive_timeout: 20,
        }
    }

    /// Updates the debounce/aging windows. A value of `0` leaves the corresponding setting
    /// unchanged.
    pub(crate) fn set_filtering(
        &mut self,
        active_read_count: u16,
        active_time_window: Timestamp,
        inactive_timeout: Timestamp,
    ) {
        if active_read_count != 0 {
            self.active_read_count = active_read_count;
        }
        if active_time_window != 0 {
            self.active_time_window = active_time_window;
        }
        if inactive_timeout != 0 {
            self.inactive_timeout = inactive_timeout;
        }
    }

    pub(crate) fn active_dtcs(&self) -> &[TrackedDtc] {
        self.active.as_slice()
    }

    pub(crate) fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Returns whether the active set has changed since the last call, clearing the flag.
    pub(crate) fn take_changed(&mut self) -> bool {
        let changed = self.changed;
        self.changed = false;
        changed
    }

    /// Records one decoded DTC sighting, refreshing an existing entry or inserting a fresh
    /// candidate, then checks whether any candidate has earned promotion to active.
    pub(crate) fn observe(
        &mut self,
        src: u8,
        spn: u32,
        fmi: u8,
        cm: u8,
        oc: u8,
        lamps: LampStates,
        ts: Timestamp,
    ) {
        let identity = (src, spn, fmi);

        if let Some(existing) = self.active.find_mut(|d| d.identity() == identity) {
            existing.refresh(oc, cm, lamps, ts);
            return;
        }

        if let Some(existing) = self.candidates.find_mut(|d| d.identity() == identity) {
            existing.refresh(oc, cm, lamps, ts);
            existing.occurrences += 1;
        } else {
            let fresh = TrackedDtc::new(src, spn, fmi, cm, oc, lamps, ts);
            if !self.candidates.push(fresh) {
                log::warn!(
                    "candidate table full ({MAX_CANDIDATE_DTCS} entries), dropping src=0x{src:02X} spn={spn} fmi={fmi}"
                );
                return;
            }
        }

        self.promote(ts);
    }

    fn promote(&mut self, ts: Timestamp) {
        let mut i = 0;
        while i < self.candidates.len() {
            let candidate = self.candidates.as_slice()[i];
            let within_window = ts.saturating_sub(candidate.first_seen) <= self.active_time_window;
            let enough_occurrences = candidate.occurrences >= self.active_read_count;

            if within_window && enough_occurrences {
                if self.active.push(candidate) {
                    self.changed = true;
                    log::debug!(
                        "promoted src=0x{:02X} spn={} fmi={} to active",
                        candidate.src,
                        candidate.spn,
                        candidate.fmi
                    );
                } else {
                    log::warn!(
                        "active table full ({MAX_ACTIVE_DTCS} entries), dropping promotion of src=0x{:02X} spn={} fmi={}",
                        candidate.src,
                        candidate.spn,
                        candidate.fmi
                    );
                }
                self.candidates.remove(i);
                // Do not advance `i`: a later candidate has shifted into this slot.
            } else {
                i += 1;
            }
        }
    }

    /// Drops candidates that fell outside the promotion window and ages out active DTCs that
    /// have gone quiet for longer than the inactive timeout.
    pub(crate) fn age(&mut self, ts: Timestamp) {
        let window = self.active_time_window;
        self.candidates
            .retain(|c| ts.saturating_sub(c.first_seen) <= window);

        let timeout = self.inactive_timeout;
        let mut i = 0;
        while i < self.active.len() {
            let dtc = self.active.as_slice()[i];
            if ts.saturating_sub(dtc.last_seen) > timeout {
                log::debug!(
                    "aged out src=0x{:02X} spn={} fmi={}",
                    dtc.src,
                    dtc.spn,
                    dtc.fmi
                );
                self.active.remove(i);
                self.changed = true;
            } else {
                i += 1;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.candidates.clear();
        self.active.clear();
        self.changed = false;
    }
}
