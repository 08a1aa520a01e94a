//! Raw HID transport for Vial keyboards (USB, hidraw)
//!
//! Vial exposes a vendor raw-HID interface (usage page 0xFF60, usage 0x61)
//! that exchanges fixed 32-byte output/input reports. The node is always
//! named by the caller; this transport does no enumeration.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::info;

use crate::error::TransportError;
use crate::protocol::{timing, REPORT_ID, REPORT_SIZE};
use crate::types::{TransportDeviceInfo, TransportType};
use crate::Transport;

/// HID transport over the Vial raw-HID interface
pub struct HidRawTransport {
    device: Mutex<HidDevice>,
    info: TransportDeviceInfo,
    read_timeout_ms: i32,
}

impl HidRawTransport {
    /// Open a hidraw node (e.g. `/dev/hidraw3`) by path
    pub fn open_path(path: &str, read_timeout_ms: Option<i32>) -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        let c_path = CString::new(path)
            .map_err(|_| TransportError::DeviceNotFound(format!("invalid path: {path}")))?;
        let device = api.open_path(&c_path)?;

        let (vid, pid) = device
            .get_device_info()
            .map(|d| (d.vendor_id(), d.product_id()))
            .unwrap_or((0, 0));
        let product_name = device.get_product_string().ok().flatten();

        info!("Opened {} ({:04X}:{:04X})", path, vid, pid);

        Ok(Self {
            device: Mutex::new(device),
            info: TransportDeviceInfo {
                vid,
                pid,
                transport_type: TransportType::HidRaw,
                device_path: path.to_string(),
                product_name,
            },
            read_timeout_ms: read_timeout_ms.unwrap_or(timing::READ_TIMEOUT_MS),
        })
    }
}

impl Transport for HidRawTransport {
    fn send_report(&self, report: &[u8]) -> Result<(), TransportError> {
        let mut buf = vec![0u8; REPORT_SIZE + 1];
        buf[0] = REPORT_ID;
        let len = report.len().min(REPORT_SIZE);
        buf[1..1 + len].copy_from_slice(&report[..len]);

        let written = self.device.lock().write(&buf)?;
        if written == 0 {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }

    fn read_report(&self) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; REPORT_SIZE];
        let n = self
            .device
            .lock()
            .read_timeout(&mut buf, self.read_timeout_ms)?;
        if n == 0 {
            return Err(TransportError::Timeout);
        }
        buf.truncate(n);
        Ok(buf)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn is_connected(&self) -> bool {
        self.device.lock().get_device_info().is_ok()
    }

    fn close(&self) -> Result<(), TransportError> {
        // hidapi closes the handle on drop
        Ok(())
    }
}
