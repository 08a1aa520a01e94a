//! Type-safe HID command builders and response parsers
//!
//! Every Hall Effect operation has a fixed byte layout. Request payloads are
//! `#[repr(C)]` byte structs serialized with zerocopy; responses start with a
//! status byte followed by the operation's payload.

use std::fmt;

use crate::protocol::{self, cmd};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

// =============================================================================
// Core Traits
// =============================================================================

/// A command that can be serialized to HID bytes
pub trait HidCommand: Sized {
    /// Operation byte (sent after the Vial prefix)
    const OP: u8;

    /// Serialize to bytes (excluding prefix and operation byte)
    fn to_data(&self) -> Vec<u8>;

    /// Build the complete request buffer (`REPORT_SIZE` bytes)
    fn build(&self) -> Vec<u8> {
        protocol::build_command(Self::OP, &self.to_data())
    }
}

/// A response that can be parsed from HID bytes
pub trait HidResponse: Sized {
    /// Payload bytes required after the status byte
    const PAYLOAD_LEN: usize;

    /// Parse from the payload (bytes after the status byte)
    fn from_payload(payload: &[u8]) -> Result<Self, ParseError>;

    /// Parse with status and length validation
    fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let Some((&status, payload)) = data.split_first() else {
            return Err(ParseError::TooShort {
                expected: 1 + Self::PAYLOAD_LEN,
                got: 0,
            });
        };
        if status != protocol::STATUS_OK {
            return Err(ParseError::Rejected { status });
        }
        if payload.len() < Self::PAYLOAD_LEN {
            return Err(ParseError::TooShort {
                expected: 1 + Self::PAYLOAD_LEN,
                got: data.len(),
            });
        }
        Self::from_payload(payload)
    }
}

/// Parse error for responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TooShort { expected: usize, got: usize },
    Rejected { status: u8 },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { expected, got } => {
                write!(
                    f,
                    "Response too short: expected {} bytes, got {}",
                    expected, got
                )
            }
            Self::Rejected { status } => {
                write!(f, "Command rejected with status 0x{:02X}", status)
            }
        }
    }
}

impl std::error::Error for ParseError {}

fn read_prefix<T: FromBytes>(payload: &[u8]) -> Result<T, ParseError> {
    T::read_from_prefix(payload)
        .map(|(value, _)| value)
        .map_err(|_| ParseError::TooShort {
            expected: 1 + std::mem::size_of::<T>(),
            got: 1 + payload.len(),
        })
}

// =============================================================================
// Actuation
// =============================================================================

/// GET_HE_ACTUATION (0x10): `[profile, row, col]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GetActuation {
    pub profile: u8,
    pub row: u8,
    pub col: u8,
}

impl HidCommand for GetActuation {
    const OP: u8 = cmd::GET_HE_ACTUATION;
    fn to_data(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Four-byte actuation record, as stored by firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ActuationRecord {
    pub actuation_point: u8,
    pub rt_mode: u8,
    pub rt_press: u8,
    pub rt_release: u8,
}

impl HidResponse for ActuationRecord {
    const PAYLOAD_LEN: usize = 4;

    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        read_prefix(payload)
    }
}

/// SET_HE_ACTUATION (0x11): `[profile, row, col, point, mode, press, release]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetActuation {
    pub profile: u8,
    pub row: u8,
    pub col: u8,
    pub record: ActuationRecord,
}

impl HidCommand for SetActuation {
    const OP: u8 = cmd::SET_HE_ACTUATION;
    fn to_data(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

// =============================================================================
// Input Priority Pairs
// =============================================================================

/// GET_HE_PRIORITY_PAIR (0x12): `[index]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GetPriorityPair {
    pub index: u8,
}

impl HidCommand for GetPriorityPair {
    const OP: u8 = cmd::GET_HE_PRIORITY_PAIR;
    fn to_data(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Raw slot contents: `[layer, row_a, col_a, row_b, col_b, resolution]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct PriorityPairResponse {
    pub slot: [u8; 6],
}

impl HidResponse for PriorityPairResponse {
    const PAYLOAD_LEN: usize = 6;

    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        read_prefix(payload)
    }
}

/// SET_HE_PRIORITY_PAIR (0x13): `[index, layer, row_a, col_a, row_b, col_b, resolution]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetPriorityPair {
    pub index: u8,
    pub slot: [u8; 6],
}

impl SetPriorityPair {
    /// Write the all-0xFF sentinel to `index`
    pub fn empty(index: u8) -> Self {
        Self {
            index,
            slot: protocol::EMPTY_PRIORITY_PAIR,
        }
    }
}

impl HidCommand for SetPriorityPair {
    const OP: u8 = cmd::SET_HE_PRIORITY_PAIR;
    fn to_data(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

// =============================================================================
// Scalar settings
// =============================================================================

/// Generic query command with no data
#[derive(Debug, Clone)]
pub struct QueryCommand<const OP_BYTE: u8>;

impl<const OP_BYTE: u8> Default for QueryCommand<OP_BYTE> {
    fn default() -> Self {
        Self
    }
}

impl<const OP_BYTE: u8> HidCommand for QueryCommand<OP_BYTE> {
    const OP: u8 = OP_BYTE;

    fn to_data(&self) -> Vec<u8> {
        vec![]
    }
}

pub type QuerySwitchOption = QueryCommand<{ cmd::GET_HE_SWITCH }>;
pub type QuerySpecialLayer = QueryCommand<{ cmd::GET_HE_SPECIAL_LAYER }>;

/// SET_HE_SWITCH (0x15): `[option]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSwitchOption {
    pub option: u8,
}

impl HidCommand for SetSwitchOption {
    const OP: u8 = cmd::SET_HE_SWITCH;
    fn to_data(&self) -> Vec<u8> {
        vec![self.option]
    }
}

/// SET_HE_SPECIAL_LAYER (0x18): `[layer]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSpecialLayer {
    pub layer: u8,
}

impl HidCommand for SetSpecialLayer {
    const OP: u8 = cmd::SET_HE_SPECIAL_LAYER;
    fn to_data(&self) -> Vec<u8> {
        vec![self.layer]
    }
}

/// Single-byte response (switch option, special layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteResponse {
    pub value: u8,
}

impl HidResponse for ByteResponse {
    const PAYLOAD_LEN: usize = 1;

    fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(Self { value: payload[0] })
    }
}

/// Status-only response of SET commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusResponse;

impl HidResponse for StatusResponse {
    const PAYLOAD_LEN: usize = 0;

    fn from_payload(_payload: &[u8]) -> Result<Self, ParseError> {
        Ok(Self)
    }
}

// =============================================================================
// Request decoding (monitoring / simulation)
// =============================================================================

/// A decoded request buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    GetActuation(GetActuation),
    SetActuation(SetActuation),
    GetPriorityPair(GetPriorityPair),
    SetPriorityPair(SetPriorityPair),
    GetSwitchOption,
    SetSwitchOption(SetSwitchOption),
    GetSpecialLayer,
    SetSpecialLayer(SetSpecialLayer),
    Unknown { op: u8 },
}

/// Decode a request buffer (`[prefix, op, data...]`).
///
/// Returns `None` when the buffer lacks the Vial prefix or is truncated.
pub fn try_parse_command(request: &[u8]) -> Option<ParsedCommand> {
    let op = protocol::request_op(request)?;
    let data = &request[2..];
    let parsed = match op {
        cmd::GET_HE_ACTUATION => {
            ParsedCommand::GetActuation(GetActuation::read_from_prefix(data).ok()?.0)
        }
        cmd::SET_HE_ACTUATION => {
            ParsedCommand::SetActuation(SetActuation::read_from_prefix(data).ok()?.0)
        }
        cmd::GET_HE_PRIORITY_PAIR => {
            ParsedCommand::GetPriorityPair(GetPriorityPair::read_from_prefix(data).ok()?.0)
        }
        cmd::SET_HE_PRIORITY_PAIR => {
            ParsedCommand::SetPriorityPair(SetPriorityPair::read_from_prefix(data).ok()?.0)
        }
        cmd::GET_HE_SWITCH => ParsedCommand::GetSwitchOption,
        cmd::SET_HE_SWITCH => ParsedCommand::SetSwitchOption(SetSwitchOption {
            option: *data.first()?,
        }),
        cmd::GET_HE_SPECIAL_LAYER => ParsedCommand::GetSpecialLayer,
        cmd::SET_HE_SPECIAL_LAYER => ParsedCommand::SetSpecialLayer(SetSpecialLayer {
            layer: *data.first()?,
        }),
        op => ParsedCommand::Unknown { op },
    };
    Some(parsed)
}

impl fmt::Display for ParsedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetActuation(c) => {
                write!(f, "GET_HE_ACTUATION p{} r{} c{}", c.profile, c.row, c.col)
            }
            Self::SetActuation(c) => write!(
                f,
                "SET_HE_ACTUATION p{} r{} c{} point={} mode={} press={} release={}",
                c.profile,
                c.row,
                c.col,
                c.record.actuation_point,
                c.record.rt_mode,
                c.record.rt_press,
                c.record.rt_release
            ),
            Self::GetPriorityPair(c) => write!(f, "GET_HE_PRIORITY_PAIR [{}]", c.index),
            Self::SetPriorityPair(c) => {
                write!(f, "SET_HE_PRIORITY_PAIR [{}] {:?}", c.index, c.slot)
            }
            Self::GetSwitchOption => f.write_str("GET_HE_SWITCH"),
            Self::SetSwitchOption(c) => write!(f, "SET_HE_SWITCH {}", c.option),
            Self::GetSpecialLayer => f.write_str("GET_HE_SPECIAL_LAYER"),
            Self::SetSpecialLayer(c) => write!(f, "SET_HE_SPECIAL_LAYER {}", c.layer),
            Self::Unknown { op } => write!(f, "UNKNOWN 0x{:02X}", op),
        }
    }
}
