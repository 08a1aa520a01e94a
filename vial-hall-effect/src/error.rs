//! Hall Effect error types

use std::fmt;

use thiserror::Error;
use vial_transport::TransportError;

/// A section of device state filled by a bulk reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSection {
    ActuationMatrix,
    PriorityPairs,
    SwitchOption,
    SpecialLayer,
}

impl fmt::Display for ReloadSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ActuationMatrix => "actuation matrix",
            Self::PriorityPairs => "input priority pairs",
            Self::SwitchOption => "switch option",
            Self::SpecialLayer => "special layer",
        })
    }
}

fn join_sections(sections: &[ReloadSection]) -> String {
    sections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from Hall Effect operations
#[derive(Error, Debug)]
pub enum HallEffectError {
    /// The transport gave up (retry budget exhausted, device gone, ...)
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// The device answered with a non-zero status byte
    #[error("Device rejected {command} (status 0x{status:02X})")]
    StatusRejected { command: &'static str, status: u8 },

    /// A bulk reload could not fill these sections; they are marked not loaded
    #[error("Reload incomplete, not loaded: {}", join_sections(.failed))]
    PartialReload { failed: Vec<ReloadSection> },

    /// The operation needs state that has not been loaded from the device
    #[error("{0} not loaded")]
    NotLoaded(ReloadSection),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Device returned unexpected response
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Backup document could not be read, written or applied
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl From<TransportError> for HallEffectError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Rejected { command, status } => Self::StatusRejected { command, status },
            TransportError::MalformedResponse(msg) => Self::UnexpectedResponse(msg),
            other => Self::Transport(other),
        }
    }
}

impl From<serde_json::Error> for HallEffectError {
    fn from(e: serde_json::Error) -> Self {
        Self::Snapshot(e.to_string())
    }
}
