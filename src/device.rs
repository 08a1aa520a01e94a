//! Opening a keyboard from configuration

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use vial_hall_effect::HallEffectKeyboard;
use vial_transport::{
    HidRawTransport, PrinterConfig, PrinterTransport, RetryTransport, SimulatedKeyboard, Transport,
};

use crate::config::Config;

/// Where to send reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSource {
    /// A hidraw node
    HidRaw(String),
    /// In-memory keyboard with factory defaults
    Simulated,
}

impl DeviceSource {
    pub fn from_config(config: &Config, simulate: bool) -> Result<Self> {
        if simulate {
            return Ok(Self::Simulated);
        }
        match &config.device.path {
            Some(path) => Ok(Self::HidRaw(path.clone())),
            None => bail!("no device path; pass --device, set [device] path, or use --simulate"),
        }
    }
}

/// Open the raw transport for `source`
pub fn open_transport(source: &DeviceSource, config: &Config) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match source {
        DeviceSource::HidRaw(path) => Arc::new(
            HidRawTransport::open_path(path, Some(config.transport.read_timeout_ms))
                .with_context(|| format!("open {path}"))?,
        ),
        DeviceSource::Simulated => {
            let geometry = config.geometry();
            info!("Using simulated {}x{} keyboard", geometry.rows, geometry.cols);
            Arc::new(SimulatedKeyboard::new(geometry.rows, geometry.cols))
        }
    };
    Ok(transport)
}

/// Build a keyboard on top of `transport`, optionally monitored
pub fn keyboard_on(
    transport: Arc<dyn Transport>,
    config: &Config,
    printer: Option<PrinterConfig>,
) -> HallEffectKeyboard {
    let transport = match printer {
        Some(printer) => PrinterTransport::wrap(transport, printer),
        None => transport,
    };
    let retry = Arc::new(RetryTransport::with_retries(
        transport,
        config.transport.retries,
    ));
    HallEffectKeyboard::new(retry, config.geometry()).with_switch_options(config.switch_options())
}

/// Open the configured keyboard
pub fn open_keyboard(
    config: &Config,
    simulate: bool,
    printer: Option<PrinterConfig>,
) -> Result<HallEffectKeyboard> {
    let source = DeviceSource::from_config(config, simulate)?;
    let transport = open_transport(&source, config)?;
    Ok(keyboard_on(transport, config, printer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_selection() {
        let config = Config::default();
        assert!(DeviceSource::from_config(&config, false).is_err());
        assert_eq!(
            DeviceSource::from_config(&config, true).unwrap(),
            DeviceSource::Simulated
        );

        let config = config.with_device_path(Some("/dev/hidraw4".into()));
        assert_eq!(
            DeviceSource::from_config(&config, false).unwrap(),
            DeviceSource::HidRaw("/dev/hidraw4".into())
        );
        assert_eq!(
            DeviceSource::from_config(&config, true).unwrap(),
            DeviceSource::Simulated
        );
    }

    #[test]
    fn test_open_simulated() {
        let mut keyboard = open_keyboard(&Config::default(), true, None).unwrap();
        keyboard.reload().unwrap();
        assert!(keyboard.is_supported());
        assert_eq!(keyboard.geometry().cols, 15);
    }
}
