//! Setting command handlers.

use super::{done, open_loaded, Context};
use crate::cli::KeyArgs;
use anyhow::{Context as _, Result};
use vial_hall_effect::{ActuationSettings, RtMode, TravelDistance};

/// Set one key's actuation in millimetres
pub fn set_actuation(
    ctx: &Context,
    key: KeyArgs,
    point: TravelDistance,
    mode: RtMode,
    press: Option<TravelDistance>,
    release: Option<TravelDistance>,
) -> Result<()> {
    let mut keyboard = open_loaded(ctx)?;
    let settings = ActuationSettings {
        actuation_point: point,
        rt_mode: mode,
        rt_press: press,
        rt_release: release,
    };
    let KeyArgs { profile, row, col } = key;
    keyboard
        .set_actuation_mm(profile, row, col, &settings)
        .with_context(|| format!("set actuation of profile {profile} row {row} col {col}"))?;

    // Show the snapped value that was actually written
    let written = keyboard.actuation_mm(profile, row, col)?;
    done(format!(
        "Profile {profile} ({row},{col}): actuation {} {}",
        written.actuation_point, written.rt_mode
    ));
    Ok(())
}

pub fn reset_profile(ctx: &Context, profile: u8) -> Result<()> {
    let mut keyboard = open_loaded(ctx)?;
    keyboard
        .reset_profile(profile)
        .with_context(|| format!("reset profile {profile}"))?;
    done(format!("Profile {profile} reset to defaults"));
    Ok(())
}

/// Select a travel option, re-quantizing every key
pub fn set_switch(ctx: &Context, option: u8) -> Result<()> {
    let mut keyboard = open_loaded(ctx)?;
    let before = keyboard.total_travel()?;
    keyboard
        .set_switch_option(option)
        .with_context(|| format!("set switch option {option}"))?;
    done(format!(
        "Switch option {option}: travel {before} -> {}",
        keyboard.total_travel()?
    ));
    Ok(())
}

pub fn set_special_layer(ctx: &Context, layer: u8) -> Result<()> {
    let mut keyboard = open_loaded(ctx)?;
    keyboard
        .set_special_layer(layer)
        .with_context(|| format!("set special layer {layer}"))?;
    if layer == 0 {
        done("Special layer disabled, profile 1 reset");
    } else {
        done(format!("Layer {} now uses profile 1", layer - 1));
    }
    Ok(())
}
