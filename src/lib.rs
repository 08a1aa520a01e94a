// Vial Hall Effect keyboard driver - shared library
// Configuration and device opening for the CLI

pub mod config;
pub mod device;

pub use config::Config;
pub use device::{open_keyboard, DeviceSource};
