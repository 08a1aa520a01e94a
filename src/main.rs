//! Vial Hall Effect keyboard CLI
//!
//! Reads and writes per-key actuation, input priority pairs and switch
//! travel on Vial magnetic keyboards.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{Cli, Commands};

mod commands;

use he_driver::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?.with_device_path(cli.device.clone());
    let printer_config = commands::create_printer_config(cli.monitor, cli.hex, cli.monitor_format);
    let ctx = commands::Context {
        config,
        simulate: cli.simulate,
        printer_config,
    };

    match cli.command {
        None | Some(Commands::Info) => commands::query::info(&ctx),
        Some(Commands::Actuation { profile, raw }) => commands::query::actuation(&ctx, profile, raw),
        Some(Commands::Pairs) => commands::priority::list(&ctx),
        Some(Commands::ActiveProfile { layer }) => commands::query::active_profile(&ctx, layer),

        // === Set Commands ===
        Some(Commands::SetActuation {
            key,
            point,
            mode,
            press,
            release,
        }) => commands::set::set_actuation(&ctx, key, point, mode, press, release),
        Some(Commands::ResetProfile { profile }) => commands::set::reset_profile(&ctx, profile),
        Some(Commands::SetSwitch { option }) => commands::set::set_switch(&ctx, option),
        Some(Commands::SetSpecialLayer { layer }) => commands::set::set_special_layer(&ctx, layer),

        // === Priority Pairs ===
        Some(Commands::AddPair { pair }) => commands::priority::add(&ctx, pair),
        Some(Commands::ReplacePair { index, pair }) => commands::priority::replace(&ctx, index, pair),
        Some(Commands::RemovePair { index }) => commands::priority::remove(&ctx, index),

        // === Backup ===
        Some(Commands::Backup { file }) => commands::backup::backup(&ctx, &file),
        Some(Commands::Restore { file }) => commands::backup::restore(&ctx, &file),
    }
}
