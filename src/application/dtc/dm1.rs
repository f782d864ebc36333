use crate::types::{CanId, Timestamp};

use super::record::LampStates;
use super::tracker::DtcTracker;

/// Minimum length of a DM1 payload: a 2-byte lamp-status header plus one 4-byte DTC record.
const MIN_PAYLOAD_LEN: usize = 6;

/// Decodes a DM1 payload (from either a single CAN frame or a reassembled multi-frame
/// message) and feeds every record it contains into `tracker`.
///
/// Payloads shorter than [`MIN_PAYLOAD_LEN`] are dropped. If the first decoded SPN is `0`
/// the frame is an idle broadcast (no active faults) and is dropped without emitting any
/// record, even if trailing bytes happen to look like further records.
pub(crate) fn parse(can_id: CanId, data: &[u8], ts: Timestamp, tracker: &mut DtcTracker) {
    let len = data.len();
    if len < MIN_PAYLOAD_LEN {
        return;
    }

    let src = (can_id & 0xFF) as u8;
    let header = data[0];
    let lamps = LampStates {
        mil: (header >> 6) & 0x3,
        rsl: (header >> 4) & 0x3,
        awl: (header >> 2) & 0x3,
        pl: header & 0x3,
    };

    let mut i = 2;
    let mut first_record = true;
    while i + 4 <= len {
        let spn = (data[i] as u32)
            | ((data[i + 1] as u32) << 8)
            | (((data[i + 2] >> 5) as u32 & 0x7) << 16);

        if first_record {
            if spn == 0 {
                return;
            }
            first_record = false;
        }

        let fmi = data[i + 2] & 0x1F;
        let cm = (data[i + 3] >> 7) & 0x1;
        let oc = data[i + 3] & 0x7F;

        tracker.observe(src, spn, fmi, cm, oc, lamps, ts);
        i += 4;
    }
}
