//! Transport abstraction layer for Vial Hall Effect keyboard communication
//!
//! This crate provides the byte-level side of the Hall Effect protocol:
//!
//! - raw HID report I/O (hidraw via hidapi, or an in-memory simulator)
//! - typed command builders and response parsers
//! - a retrying query layer on top of any raw transport
//! - a printing decorator for monitoring traffic

pub mod command;
pub mod error;
pub mod printer;
pub mod protocol;
pub mod simulator;
pub mod types;

mod flow_control;
mod hid_raw;

pub use command::{
    try_parse_command, ActuationRecord, ByteResponse, GetActuation, GetPriorityPair, HidCommand,
    HidResponse, ParseError, ParsedCommand, PriorityPairResponse, QuerySpecialLayer,
    QuerySwitchOption, SetActuation, SetPriorityPair, SetSpecialLayer, SetSwitchOption,
    StatusResponse,
};
pub use error::TransportError;
pub use flow_control::RetryTransport;
pub use hid_raw::HidRawTransport;
pub use printer::{OutputFormat, PrinterConfig, PrinterTransport};
pub use simulator::SimulatedKeyboard;
pub use types::{TransportDeviceInfo, TransportType};

use std::sync::Arc;

/// The raw transport trait - all backends implement this
///
/// A backend only moves single reports; request/response pairing and retries
/// live in [`RetryTransport`].
pub trait Transport: Send + Sync {
    /// Send one request buffer (`REPORT_SIZE` bytes, without report ID)
    fn send_report(&self, report: &[u8]) -> Result<(), TransportError>;

    /// Read one response report (`REPORT_SIZE` bytes, without report ID)
    ///
    /// Returns [`TransportError::Timeout`] if nothing arrived in time.
    fn read_report(&self) -> Result<Vec<u8>, TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Check if transport is still connected
    fn is_connected(&self) -> bool;

    /// Close the transport gracefully
    fn close(&self) -> Result<(), TransportError>;
}

/// Type alias for a shared transport
pub type BoxedTransport = Arc<dyn Transport>;
