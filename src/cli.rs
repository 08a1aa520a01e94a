// CLI definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vial_hall_effect::{Resolution, RtMode, TravelDistance};
use vial_transport::OutputFormat;

#[derive(Parser)]
#[command(name = "he_driver")]
#[command(author, version, about = "Vial Hall Effect keyboard actuation tool")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ./he_driver.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// hidraw node of the keyboard (overrides [device] path)
    #[arg(long, global = true, value_name = "PATH")]
    pub device: Option<String>,

    /// Talk to an in-memory keyboard instead of hardware
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Enable transport monitoring (prints all commands/responses)
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Monitor output format (text or json)
    #[arg(long, global = true, value_name = "FORMAT", default_value = "text")]
    pub monitor_format: OutputFormat,

    /// Show raw hex dump alongside decoded output
    #[arg(long, global = true)]
    pub hex: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Query Commands ===
    /// Show device, switch option and special layer
    #[command(visible_alias = "i")]
    Info,

    /// Show the actuation matrix in millimetres
    #[command(visible_alias = "a")]
    Actuation {
        /// Only this profile (0 default, 1 special)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..2))]
        profile: Option<u8>,
        /// Show raw device values instead of millimetres
        #[arg(long)]
        raw: bool,
    },

    /// List input priority pairs
    #[command(visible_alias = "p")]
    Pairs,

    /// Which profile is in effect on a layer
    ActiveProfile {
        /// Keymap layer
        layer: u8,
    },

    // === Set Commands ===
    /// Set one key's actuation
    #[command(visible_alias = "sa")]
    SetActuation {
        #[command(flatten)]
        key: KeyArgs,
        /// Actuation point (e.g. 1.8 or 1.80mm)
        point: TravelDistance,
        /// Rapid trigger mode (off, rt, crt)
        #[arg(short, long, default_value = "off")]
        mode: RtMode,
        /// Press sensitivity (required with rapid trigger)
        #[arg(long)]
        press: Option<TravelDistance>,
        /// Separate release sensitivity
        #[arg(long)]
        release: Option<TravelDistance>,
    },

    /// Reset every key of a profile to the default actuation
    ResetProfile {
        #[arg(value_parser = clap::value_parser!(u8).range(0..2))]
        profile: u8,
    },

    /// Append an input priority pair
    #[command(visible_alias = "ap")]
    AddPair {
        #[command(flatten)]
        pair: PairArgs,
    },

    /// Replace the pair at an index
    ReplacePair {
        index: usize,
        #[command(flatten)]
        pair: PairArgs,
    },

    /// Remove the pair at an index and compact the list
    #[command(visible_alias = "rp")]
    RemovePair { index: usize },

    /// Select the switch travel option (re-quantizes every key)
    SetSwitch { option: u8 },

    /// Select the layer using the special profile (0 disables it)
    SetSpecialLayer { layer: u8 },

    // === Backup ===
    /// Save the whole Hall Effect state to a JSON file
    Backup { file: PathBuf },

    /// Write a JSON backup to the keyboard
    Restore { file: PathBuf },
}

/// Key position in the actuation matrix
#[derive(Args, Debug, Clone, Copy)]
pub struct KeyArgs {
    /// Profile (0 default, 1 special)
    #[arg(value_parser = clap::value_parser!(u8).range(0..2))]
    pub profile: u8,
    pub row: u8,
    pub col: u8,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PairArgs {
    pub layer: u8,
    pub row_a: u8,
    pub col_a: u8,
    pub row_b: u8,
    pub col_b: u8,
    /// last-wins, absolute-a, absolute-b, neutral or depth
    pub resolution: Resolution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_format_flag() {
        let cli = Cli::try_parse_from(["he_driver", "--monitor", "--monitor-format", "json", "info"])
            .unwrap();
        assert!(cli.monitor);
        assert_eq!(cli.monitor_format, OutputFormat::Json);

        let cli = Cli::try_parse_from(["he_driver", "pairs"]).unwrap();
        assert_eq!(cli.monitor_format, OutputFormat::Text);

        assert!(Cli::try_parse_from(["he_driver", "--monitor-format", "xml"]).is_err());
    }
}
