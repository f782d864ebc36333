use crate::types::CanId;

/// PGN of the Active Diagnostic Trouble Codes (DM1) message.
const PGN_DM1: u32 = 0xFECA;

/// BAM control byte identifying a Connection Management announcement.
const TP_CM_CONTROL_BAM: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameClass {
    /// A single-frame DM1 broadcast: the whole payload fits in one CAN frame.
    Dm1SingleFrame,
    /// A TP.CM BAM announcing a multi-frame DM1 broadcast.
    TransportConnectionManagement,
    /// A TP.DT fragment belonging to a previously announced multi-frame message.
    TransportDataTransfer,
    /// Anything else on the bus; not this monitor's concern.
    Unrelated,
}

/// Classifies a 29-bit extended CAN identifier (and, for TP.CM, its payload) by the
/// PDU-format/PDU-specific byte pair it carries.
///
/// DM1 is matched against the full PGN (its PDU Specific byte, 0xCA, is a group extension and
/// part of the PGN, not a destination address). TP.CM and TP.DT are matched against the PDU
/// Format byte alone, since both are destination-specific and a BAM's destination is the
/// broadcast address 0xFF, not something worth branching on here. A TP.CM frame is classified
/// as [`FrameClass::Unrelated`] unless it is a BAM announcing a DM1 broadcast specifically:
/// this crate only reassembles DM1, and RTS/CTS peer-to-peer transport is out of scope.
pub(crate) fn classify(can_id: CanId, data: &[u8; 8]) -> FrameClass {
    if can_id & 0x00FF_FF00 == 0x00FE_CA00 {
        FrameClass::Dm1SingleFrame
    } else if can_id & 0x00FF_0000 == 0x00EC_0000 {
        let pgn = data[5] as u32 | (data[6] as u32) << 8 | (data[7] as u32) << 16;
        if data[0] == TP_CM_CONTROL_BAM && pgn == PGN_DM1 {
            FrameClass::TransportConnectionManagement
        } else {
            FrameClass::Unrelated
        }
    } else if can_id & 0x00FF_0000 == 0x00EB_0000 {
        FrameClass::TransportDataTransfer
    } else {
        FrameClass::Unrelated
    }
}
