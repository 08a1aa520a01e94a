//! Flow-control transport layer
//!
//! `RetryTransport` wraps a raw `Transport` (which only does send/read of
//! individual HID reports) and adds query semantics: one request/response
//! exchange per call, retried up to a fixed budget.
//!
//! ```text
//! [HidRawTransport / SimulatedKeyboard]  ← implements Transport (raw I/O)
//!                |
//!         [RetryTransport]                ← adds retries, status checking
//!                |
//!        [HallEffectKeyboard]
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::command::{HidCommand, HidResponse, ParseError};
use crate::error::TransportError;
use crate::protocol::{cmd, timing};
use crate::types::TransportDeviceInfo;
use crate::Transport;

/// A transport wrapper that retries each exchange until a report arrives or
/// the retry budget runs out.
///
/// Callers only ever see success or a single terminal failure.
pub struct RetryTransport {
    inner: Arc<dyn Transport>,
    retries: usize,
}

impl RetryTransport {
    /// Wrap a raw transport with the default retry budget
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self::with_retries(inner, timing::QUERY_RETRIES)
    }

    /// Wrap a raw transport with a custom retry budget (minimum 1 attempt)
    pub fn with_retries(inner: Arc<dyn Transport>, retries: usize) -> Self {
        Self {
            inner,
            retries: retries.max(1),
        }
    }

    /// Device information of the wrapped transport
    pub fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    /// Send a request buffer and wait for the response report.
    ///
    /// The request is resent on every failed attempt; all Hall Effect
    /// commands are idempotent so a duplicate write is harmless.
    pub fn query_report(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let op = request.get(1).copied().unwrap_or(0);

        for attempt in 0..self.retries {
            if let Err(e) = self.inner.send_report(request) {
                debug!("Send attempt {} failed for {}: {}", attempt, cmd::name(op), e);
                continue;
            }

            match self.inner.read_report() {
                Ok(resp) if !resp.is_empty() => return Ok(resp),
                Ok(_) => debug!("Empty response for {} (attempt {})", cmd::name(op), attempt),
                Err(e) => debug!("Read attempt {} failed for {}: {}", attempt, cmd::name(op), e),
            }
        }

        Err(TransportError::Exhausted {
            command: cmd::name(op),
        })
    }

    /// Send a typed command and parse its typed response.
    ///
    /// A non-zero status byte is reported as [`TransportError::Rejected`]
    /// without retrying: the device answered, it just declined.
    pub fn query<C, R>(&self, command: &C) -> Result<R, TransportError>
    where
        C: HidCommand,
        R: HidResponse,
    {
        let resp = self.query_report(&command.build())?;
        R::parse(&resp).map_err(|e| match e {
            ParseError::Rejected { status } => TransportError::Rejected {
                command: cmd::name(C::OP),
                status,
            },
            other => TransportError::MalformedResponse(format!("{}: {}", cmd::name(C::OP), other)),
        })
    }
}
