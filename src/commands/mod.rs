//! Command handlers for the CLI application.
//!
//! - `query`: read-only commands (info, actuation, active-profile)
//! - `set`: actuation, profile reset, switch option, special layer
//! - `priority`: input priority pair list
//! - `backup`: JSON backup and restore

pub mod backup;
pub mod priority;
pub mod query;
pub mod set;

use anyhow::Result;
use crossterm::style::Stylize;
use he_driver::{open_keyboard, Config};
use vial_hall_effect::{HallEffectError, HallEffectKeyboard};
use vial_transport::{OutputFormat, PrinterConfig};

/// Settings shared by every command
pub struct Context {
    pub config: Config,
    pub simulate: bool,
    pub printer_config: Option<PrinterConfig>,
}

/// Create printer config from CLI flags
pub fn create_printer_config(
    monitor: bool,
    hex: bool,
    format: OutputFormat,
) -> Option<PrinterConfig> {
    monitor.then(|| PrinterConfig::default().with_hex(hex).with_format(format))
}

/// Open the keyboard and read its state.
///
/// A partial reload is reported but not fatal; commands touching a
/// missing section fail with `NotLoaded`.
pub fn open_loaded(ctx: &Context) -> Result<HallEffectKeyboard> {
    let mut keyboard = open_keyboard(&ctx.config, ctx.simulate, ctx.printer_config.clone())?;
    match keyboard.reload() {
        Ok(()) => {}
        Err(HallEffectError::PartialReload { failed }) => {
            let names: Vec<String> = failed.iter().map(ToString::to_string).collect();
            eprintln!("{} not loaded: {}", "Warning:".yellow(), names.join(", "));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(keyboard)
}

/// Print a success line
pub fn done(message: impl std::fmt::Display) {
    println!("{} {}", "✓".green(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_config_from_flags() {
        assert!(create_printer_config(false, true, OutputFormat::Json).is_none());

        let config = create_printer_config(true, true, OutputFormat::Json).unwrap();
        assert!(config.show_hex);
        assert_eq!(config.format, OutputFormat::Json);

        let config = create_printer_config(true, false, OutputFormat::Text).unwrap();
        assert_eq!(config.format, OutputFormat::Text);
    }
}
