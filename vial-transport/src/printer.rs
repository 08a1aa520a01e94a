//! PrinterTransport middleware for monitoring transport traffic
//!
//! Wraps any raw [`Transport`] and prints every request and response report
//! to stderr, decoded where possible.
//!
//! # Example
//!
//! ```ignore
//! use vial_transport::{HidRawTransport, PrinterConfig, PrinterTransport};
//!
//! let transport = HidRawTransport::open_path("/dev/hidraw3", None)?;
//! let monitored = PrinterTransport::wrap(Arc::new(transport), PrinterConfig::default());
//! ```

use std::str::FromStr;
use std::sync::Arc;

use crossterm::style::Stylize;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::protocol::{self, cmd};
use crate::{try_parse_command, Transport, TransportDeviceInfo, TransportError};

/// Output format for the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Configuration for the PrinterTransport
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Show raw hex dump alongside decoded output
    pub show_hex: bool,
    /// Output format
    pub format: OutputFormat,
}

impl PrinterConfig {
    /// Create config with hex output setting
    pub fn with_hex(mut self, show: bool) -> Self {
        self.show_hex = show;
        self
    }

    /// Create config with output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Transport middleware that prints all requests and responses
pub struct PrinterTransport {
    inner: Arc<dyn Transport>,
    config: PrinterConfig,
    /// Operation of the request awaiting its response
    last_op: Mutex<Option<u8>>,
}

impl PrinterTransport {
    /// Wrap a transport with printing middleware
    pub fn wrap(transport: Arc<dyn Transport>, config: PrinterConfig) -> Arc<dyn Transport> {
        Arc::new(Self::new(transport, config))
    }

    pub fn new(transport: Arc<dyn Transport>, config: PrinterConfig) -> Self {
        if config.format == OutputFormat::Json {
            eprintln!("{}", Self::device_json(transport.device_info()));
        }
        Self {
            inner: transport,
            config,
            last_op: Mutex::new(None),
        }
    }

    /// Render a request line (without colour)
    pub fn describe_request(report: &[u8]) -> String {
        match try_parse_command(report) {
            Some(parsed) => parsed.to_string(),
            None => format!("NON-VIAL {:02x?}", trimmed(report)),
        }
    }

    /// Render a response line for `op` (without colour)
    pub fn describe_response(op: Option<u8>, report: &[u8]) -> String {
        let name = op.map(cmd::name).unwrap_or("UNKNOWN");
        match report.split_first() {
            Some((&protocol::STATUS_OK, payload)) => {
                format!("{} OK {:02x?}", name, payload_for(op, payload))
            }
            Some((status, _)) => format!("{} REJECTED status=0x{:02X}", name, status),
            None => format!("{} EMPTY", name),
        }
    }

    /// JSON header line identifying the monitored device
    pub fn device_json(info: &TransportDeviceInfo) -> Value {
        json!({ "dir": "device", "device": info })
    }

    /// JSON line for a request report
    pub fn request_json(report: &[u8]) -> Value {
        json!({
            "dir": "out",
            "op": protocol::request_op(report),
            "decoded": Self::describe_request(report),
            "hex": hex(report),
        })
    }

    /// JSON line for a response to `op`
    pub fn response_json(op: Option<u8>, report: &[u8]) -> Value {
        json!({
            "dir": "in",
            "op": op,
            "status": report.first(),
            "decoded": Self::describe_response(op, report),
            "hex": hex(report),
        })
    }

    fn print_request(&self, report: &[u8]) {
        match self.config.format {
            OutputFormat::Json => eprintln!("{}", Self::request_json(report)),
            OutputFormat::Text => {
                let line = Self::describe_request(report);
                eprintln!("{} {}  {}", ">>>".cyan(), "CMD".cyan().bold(), line);
                if self.config.show_hex {
                    eprintln!("    {}  {}", "HEX".dim(), hex(report));
                }
            }
        }
    }

    fn print_response(&self, op: Option<u8>, report: &[u8]) {
        match self.config.format {
            OutputFormat::Json => eprintln!("{}", Self::response_json(op, report)),
            OutputFormat::Text => {
                let line = Self::describe_response(op, report);
                let tag = match report.first() {
                    Some(&protocol::STATUS_OK) => "RSP".green().bold(),
                    _ => "RSP".red().bold(),
                };
                eprintln!("{} {}  {}", "<<<".green(), tag, line);
                if self.config.show_hex {
                    eprintln!("    {}  {}", "HEX".dim(), hex(report));
                }
            }
        }
    }
}

/// Payload bytes meaningful for the answered operation
fn payload_for(op: Option<u8>, payload: &[u8]) -> &[u8] {
    let len = match op {
        Some(cmd::GET_HE_ACTUATION) => 4,
        Some(cmd::GET_HE_PRIORITY_PAIR) => 6,
        Some(cmd::GET_HE_SWITCH) | Some(cmd::GET_HE_SPECIAL_LAYER) => 1,
        _ => 0,
    };
    &payload[..len.min(payload.len())]
}

/// Strip trailing zero padding
fn trimmed(report: &[u8]) -> &[u8] {
    let end = report.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &report[..end]
}

fn hex(report: &[u8]) -> String {
    report
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Transport for PrinterTransport {
    fn send_report(&self, report: &[u8]) -> Result<(), TransportError> {
        self.print_request(report);
        *self.last_op.lock() = protocol::request_op(report);
        self.inner.send_report(report)
    }

    fn read_report(&self) -> Result<Vec<u8>, TransportError> {
        let result = self.inner.read_report()?;
        let op = *self.last_op.lock();
        self.print_response(op, &result);
        Ok(result)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn close(&self) -> Result<(), TransportError> {
        self.inner.close()
    }
}
