//! Protocol constants and utilities for Vial Hall Effect keyboard communication

/// Size of a raw HID report (excluding report ID)
pub const REPORT_SIZE: usize = 32;

/// HID report ID prepended to output reports
pub const REPORT_ID: u8 = 0x00;

/// Vial command prefix shared by all Vial-extended commands
pub const VIA_VIAL_PREFIX: u8 = 0xFE;

/// Status byte of an accepted command
pub const STATUS_OK: u8 = 0x00;

/// Number of input priority slots on the device
pub const PRIORITY_SLOTS: usize = 8;

/// Byte value marking an empty priority slot
pub const EMPTY_SLOT_BYTE: u8 = 0xFF;

/// Payload written to a slot to mark it empty
pub const EMPTY_PRIORITY_PAIR: [u8; 6] = [EMPTY_SLOT_BYTE; 6];

/// Hall Effect operation bytes (sent after [`VIA_VIAL_PREFIX`])
pub mod cmd {
    pub const GET_HE_ACTUATION: u8 = 0x10;
    pub const SET_HE_ACTUATION: u8 = 0x11;
    pub const GET_HE_PRIORITY_PAIR: u8 = 0x12;
    pub const SET_HE_PRIORITY_PAIR: u8 = 0x13;
    pub const GET_HE_SWITCH: u8 = 0x14;
    pub const SET_HE_SWITCH: u8 = 0x15;
    pub const GET_HE_SPECIAL_LAYER: u8 = 0x17;
    pub const SET_HE_SPECIAL_LAYER: u8 = 0x18;

    /// Get human-readable name for operation byte
    pub fn name(op: u8) -> &'static str {
        match op {
            GET_HE_ACTUATION => "GET_HE_ACTUATION",
            SET_HE_ACTUATION => "SET_HE_ACTUATION",
            GET_HE_PRIORITY_PAIR => "GET_HE_PRIORITY_PAIR",
            SET_HE_PRIORITY_PAIR => "SET_HE_PRIORITY_PAIR",
            GET_HE_SWITCH => "GET_HE_SWITCH",
            SET_HE_SWITCH => "SET_HE_SWITCH",
            GET_HE_SPECIAL_LAYER => "GET_HE_SPECIAL_LAYER",
            SET_HE_SPECIAL_LAYER => "SET_HE_SPECIAL_LAYER",
            _ => "UNKNOWN",
        }
    }
}

/// Timing and retry budget
pub mod timing {
    /// Attempts per exchange before giving up
    pub const QUERY_RETRIES: usize = 20;
    /// Read timeout for a single response report (ms)
    pub const READ_TIMEOUT_MS: i32 = 500;
}

/// Build a request buffer: `[prefix, op, data..., 0...]`, `REPORT_SIZE` bytes long.
///
/// Data beyond the report size is truncated.
pub fn build_command(op: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; REPORT_SIZE];
    buf[0] = VIA_VIAL_PREFIX;
    buf[1] = op;
    let len = std::cmp::min(data.len(), REPORT_SIZE - 2);
    buf[2..2 + len].copy_from_slice(&data[..len]);
    buf
}

/// Extract the operation byte from a request buffer built by [`build_command`]
pub fn request_op(request: &[u8]) -> Option<u8> {
    match request {
        [VIA_VIAL_PREFIX, op, ..] => Some(*op),
        _ => None,
    }
}

/// Whether a 6-byte priority slot denotes "empty"
///
/// Firmware writes all-0xFF for empty slots; a slot whose layer or first row
/// byte is 0xFF can never hold a usable pair.
pub fn is_empty_priority_slot(slot: &[u8; 6]) -> bool {
    slot[0] == EMPTY_SLOT_BYTE || slot[1] == EMPTY_SLOT_BYTE
}
