//! Query (read-only) command handlers.

use super::{open_loaded, Context};
use anyhow::Result;
use crossterm::style::Stylize;
use vial_hall_effect::actuation::POINT_STEP;
use vial_hall_effect::{
    ActuationMatrix, ActuationSettings, InputPriorityTable, TravelDistance, PROFILE_COUNT,
};

/// Device identity and scalar settings
pub fn info(ctx: &Context) -> Result<()> {
    let keyboard = open_loaded(ctx)?;
    let dev = keyboard.device_info();
    let geometry = keyboard.geometry();

    println!("{}", dev.display_name().bold());
    println!("  Path:          {}", dev.device_path);
    println!("  Transport:     {:?}", dev.transport_type);
    println!(
        "  Matrix:        {} rows x {} cols, {} layers",
        geometry.rows, geometry.cols, geometry.layers
    );
    println!(
        "  Hall Effect:   {}",
        if keyboard.is_supported() {
            "supported".green()
        } else {
            "not supported".red()
        }
    );

    match keyboard.switch_option() {
        Some(option) => match keyboard.total_travel() {
            Ok(travel) => println!("  Switch option: {option} ({travel} travel)"),
            Err(_) => println!("  Switch option: {option} (not in travel table)"),
        },
        None => println!("  Switch option: {}", "unknown".dim()),
    }
    match keyboard.special_layer() {
        Some(0) => println!("  Special layer: none"),
        Some(layer) => println!("  Special layer: {layer} (profile 1 on layer {})", layer - 1),
        None => println!("  Special layer: {}", "unknown".dim()),
    }
    if let Some(pairs) = keyboard.priority_pairs() {
        println!(
            "  Priority pairs: {}/{}",
            pairs.len(),
            InputPriorityTable::CAPACITY
        );
    }

    let options: Vec<String> = keyboard
        .switch_options()
        .iter()
        .map(|(i, t)| format!("{i}={t}"))
        .collect();
    println!("  Travel table:  {}", options.join(" "));
    Ok(())
}

/// Print the actuation matrix, one grid per profile
pub fn actuation(ctx: &Context, profile: Option<u8>, raw: bool) -> Result<()> {
    let keyboard = open_loaded(ctx)?;
    let matrix = keyboard
        .matrix()
        .ok_or_else(|| anyhow::anyhow!("actuation matrix not loaded"))?;
    let travel = if raw {
        None
    } else {
        Some(keyboard.total_travel()?)
    };

    let profiles: Vec<u8> = match profile {
        Some(p) => vec![p],
        None => (0..PROFILE_COUNT).collect(),
    };
    for p in profiles {
        print_profile(matrix, p, travel);
    }
    Ok(())
}

fn print_profile(matrix: &ActuationMatrix, profile: u8, travel: Option<TravelDistance>) {
    let title = match profile {
        0 => "Profile 0 (default)",
        _ => "Profile 1 (special layer)",
    };
    println!("{}", title.bold());

    print!("     ");
    for col in 0..matrix.cols() {
        print!("{:>6}", format!("c{col}"));
    }
    println!();

    let mut rapid = Vec::new();
    for row in 0..matrix.rows() {
        print!("  r{row:<2}");
        for col in 0..matrix.cols() {
            let Some(cell) = matrix.get(profile, row, col) else {
                continue;
            };
            let text = match travel {
                Some(t) => {
                    let point = TravelDistance::from_raw(cell.actuation_point, t, POINT_STEP).hundredths();
                    format!("{}.{:02}", point / 100, point % 100)
                }
                None => cell.actuation_point.to_string(),
            };
            if cell.rt_mode.is_off() {
                print!("{text:>6}");
            } else {
                print!("{}", format!("{text:>6}").cyan());
                rapid.push((row, col, *cell));
            }
        }
        println!();
    }

    for (row, col, cell) in rapid {
        match travel {
            Some(t) => {
                let mm = ActuationSettings::decode(&cell, t);
                let release = mm
                    .rt_release
                    .map_or_else(|| "same".to_string(), |r| r.to_string());
                println!(
                    "  ({row},{col}) {}: press {} release {}",
                    mm.rt_mode,
                    mm.rt_press.map_or_else(String::new, |p| p.to_string()),
                    release
                );
            }
            None => println!(
                "  ({row},{col}) {}: press {} release {}",
                cell.rt_mode, cell.rt_press, cell.rt_release
            ),
        }
    }
    println!();
}

/// Profile selected on a keymap layer
pub fn active_profile(ctx: &Context, layer: u8) -> Result<()> {
    let keyboard = open_loaded(ctx)?;
    match keyboard.active_profile(layer) {
        Some(profile) => println!("Layer {layer} uses profile {profile}"),
        None => anyhow::bail!("special layer not loaded, active profile unknown"),
    }
    Ok(())
}
