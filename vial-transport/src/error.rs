//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disconnected")]
    Disconnected,

    /// A single attempt received no report in time
    #[error("Communication timeout")]
    Timeout,

    /// Every attempt of the retry budget failed
    #[error("No response from device after retrying {command}")]
    Exhausted { command: &'static str },

    /// The device answered with a non-zero status byte
    #[error("Device rejected {command} (status 0x{status:02X})")]
    Rejected { command: &'static str, status: u8 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            TransportError::HidPermissionDenied(msg)
        } else {
            TransportError::HidError(msg)
        }
    }
}
