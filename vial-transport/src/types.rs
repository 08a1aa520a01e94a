//! Common types for transport layer

use serde::Serialize;

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportType {
    /// Raw HID interface (USB)
    HidRaw,
    /// In-memory firmware model
    Simulated,
}

/// Device identification information
#[derive(Debug, Clone, Serialize)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID (0 when unknown)
    pub vid: u16,
    /// USB Product ID (0 when unknown)
    pub pid: u16,
    /// Transport type
    pub transport_type: TransportType,
    /// Device path or identifier (transport-specific)
    pub device_path: String,
    /// Product name if available
    pub product_name: Option<String>,
}

impl TransportDeviceInfo {
    /// Display name: product name, or VID:PID, or the path
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.product_name {
            return name.clone();
        }
        if self.vid != 0 || self.pid != 0 {
            return format!("{:04X}:{:04X}", self.vid, self.pid);
        }
        self.device_path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(product_name: Option<&str>, vid: u16, pid: u16) -> TransportDeviceInfo {
        TransportDeviceInfo {
            vid,
            pid,
            transport_type: TransportType::HidRaw,
            device_path: "/dev/hidraw4".into(),
            product_name: product_name.map(str::to_string),
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(info(Some("HE60"), 1, 2).display_name(), "HE60");
        assert_eq!(info(None, 0x1234, 0xABCD).display_name(), "1234:ABCD");
        assert_eq!(info(None, 0, 0).display_name(), "/dev/hidraw4");
    }
}
