use crate::types::{CanId, Timestamp};

use super::dm1;
use super::tracker::DtcTracker;

/// Maximum number of multi-frame (BAM) messages that can be reassembled concurrently.
pub const MAX_CONCURRENT_MULTIFRAME: usize = 4;

/// Maximum assembled payload size for a single multi-frame message.
pub const MAX_MULTIFRAME_DATA_SIZE: usize = 256;

/// Bytes of payload carried per TP.DT fragment.
const BYTES_PER_FRAGMENT: usize = 7;

/// Reassembly state for one in-progress multi-frame message.
///
/// `announce_id == 0` marks a slot free: a real J1939 source address of `0x00` colliding with
/// this sentinel would need the announcing CAN identifier itself to be all-zero, which the
/// classifier would never route here in the first place.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MultiFrameSlot {
    announce_id: CanId,
    data_id: CanId,
    total_size: usize,
    num_packets: u8,
    received_packets: u8,
    first_seen: Timestamp,
    last_seen: Timestamp,
    data: [u8; MAX_MULTIFRAME_DATA_SIZE],
}

impl Default for MultiFrameSlot {
    fn default() -> Self {
        Self {
            announce_id: 0,
            data_id: 0,
            total_size: 0,
            num_packets: 0,
            received_packets: 0,
            first_seen: 0,
            last_seen: 0,
            data: [0; MAX_MULTIFRAME_DATA_SIZE],
        }
    }
}

impl MultiFrameSlot {
    fn is_free(&self) -> bool {
        self.announce_id == 0
    }
}

/// Owns the fixed pool of [`MultiFrameSlot`]s and drives BAM/TP.DT reassembly.
///
/// Slots are addressed by position and freed in place via the sentinel above, not compacted
/// like [`super::bounded::BoundedList`] — a slot's index is stable for its whole lifetime so a
/// TP.DT fragment can find it again by `data_id` alone.
pub(crate) struct Reassembler {
    slots: [MultiFrameSlot; MAX_CONCURRENT_MULTIFRAME],
    timeout: Timestamp,
}

impl Reassembler {
    pub(crate) fn new() -> Self {
        Self {
            slots: [MultiFrameSlot::default(); MAX_CONCURRENT_MULTIFRAME],
            timeout: 5,
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Timestamp) {
        if timeout != 0 {
            self.timeout = timeout;
        }
    }

    /// Handles a TP.CM message the classifier has already confirmed is a BAM announcing a DM1
    /// broadcast, claiming a slot for it.
    pub(crate) fn handle_announcement(&mut self, can_id: CanId, data: &[u8; 8], ts: Timestamp) {
        let total_size = data[1] as usize | (data[2] as usize) << 8;
        let num_packets = data[3];
        if total_size == 0 || total_size > MAX_MULTIFRAME_DATA_SIZE {
            log::warn!(
                "BAM announced size {total_size} outside 1..={MAX_MULTIFRAME_DATA_SIZE}, dropping"
            );
            return;
        }

        let announce_id = can_id & 0x1FFF_FFFF;
        let index = self
            .slots
            .iter()
            .position(|s| s.announce_id == announce_id)
            .or_else(|| self.slots.iter().position(MultiFrameSlot::is_free));
        let Some(index) = index else {
            log::warn!("no free multi-frame slot for BAM 0x{announce_id:08X}, dropping");
            return;
        };

        // TP.DT fragments for this message share the PDU-specific and source bytes of the
        // announcement but move from the TP.CM PGN to the TP.DT PGN (0xEB00).
        let data_id = (announce_id & 0xFF00_FFFF) | 0x00EB_0000;
        self.slots[index] = MultiFrameSlot {
            announce_id,
            data_id,
            total_size,
            num_packets,
            received_packets: 0,
            first_seen: ts,
            last_seen: ts,
            data: [0; MAX_MULTIFRAME_DATA_SIZE],
        };
    }

    /// Handles one TP.DT fragment, completing and parsing the message once every fragment has
    /// arrived in order.
    pub(crate) fn handle_fragment(
        &mut self,
        can_id: CanId,
        data: &[u8; 8],
        ts: Timestamp,
        tracker: &mut DtcTracker,
    ) {
        let data_id = can_id & 0x1FFF_FFFF;
        let Some(index) = self
            .slots
            .iter()
            .position(|s| !s.is_free() && s.data_id == data_id)
        else {
            return;
        };

        let packet_number = data[0];
        let expected = self.slots[index].received_packets + 1;
        if packet_number != expected {
            log::debug!(
                "out-of-order TP.DT for 0x{data_id:08X}: got {packet_number}, expected {expected}, discarding"
            );
            self.slots[index] = MultiFrameSlot::default();
            return;
        }

        let offset = (packet_number as usize - 1) * BYTES_PER_FRAGMENT;
        if offset + BYTES_PER_FRAGMENT > MAX_MULTIFRAME_DATA_SIZE {
            log::warn!("TP.DT fragment for 0x{data_id:08X} overruns assembly buffer, discarding");
            self.slots[index] = MultiFrameSlot::default();
            return;
        }

        let slot = &mut self.slots[index];
        slot.data[offset..offset + BYTES_PER_FRAGMENT].copy_from_slice(&data[1..]);
        slot.received_packets += 1;
        slot.last_seen = ts;

        if slot.received_packets == slot.num_packets {
            let announce_id = slot.announce_id;
            let total_size = slot.total_size;
            let payload = slot.data;
            self.slots[index] = MultiFrameSlot::default();
            dm1::parse(announce_id, &payload[..total_size], ts, tracker);
        }
    }

    /// Releases any slot that has not seen a fragment within the multi-frame timeout.
    pub(crate) fn age(&mut self, ts: Timestamp) {
        let timeout = self.timeout;
        for slot in self.slots.iter_mut() {
            if !slot.is_free() && ts.saturating_sub(slot.last_seen) > timeout {
                log::debug!("releasing stale multi-frame slot 0x{:08X}", slot.announce_id);
                *slot = MultiFrameSlot::default();
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots = [MultiFrameSlot::default(); MAX_CONCURRENT_MULTIFRAME];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bam(total_size: u16, num_packets: u8) -> [u8; 8] {
        let size = total_size.to_le_bytes();
        [
            0x20,
            size[0],
            size[1],
            num_packets,
            0xFF,
            0xCA,
            0xFE,
            0x00,
        ]
    }

    #[test]
    fn claims_slot_for_dm1_bam() {
        let mut r = Reassembler::new();
        r.handle_announcement(0x18ECFF00, &bam(12, 2), 0);
        assert_eq!(r.slots.iter().filter(|s| !s.is_free()).count(), 1);
    }

    #[test]
    fn out_of_order_fragment_discards_slot() {
        let mut r = Reassembler::new();
        let mut tracker = DtcTracker::new();
        r.handle_announcement(0x18ECFF00, &bam(12, 2), 0);
        // Skip packet 1, send packet 2 first.
        let frag2 = [0x02, 0, 0, 0, 0, 0, 0, 0];
        r.handle_fragment(0x18EBFF00, &frag2, 1, &mut tracker);
        assert!(r.slots.iter().all(MultiFrameSlot::is_free));
    }

    #[test]
    fn stale_slot_ages_out() {
        let mut r = Reassembler::new();
        r.set_timeout(5);
        r.handle_announcement(0x18ECFF00, &bam(12, 2), 0);
        r.age(10);
        assert!(r.slots.iter().all(MultiFrameSlot::is_free));
    }
}
