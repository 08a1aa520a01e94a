//! JSON backup and restore.

use super::{done, open_loaded, Context};
use anyhow::{Context as _, Result};
use std::path::Path;
use vial_hall_effect::{HallEffectError, HallEffectSnapshot};

pub fn backup(ctx: &Context, file: &Path) -> Result<()> {
    let keyboard = open_loaded(ctx)?;
    let snapshot = keyboard.snapshot().context("capture Hall Effect state")?;
    std::fs::write(file, snapshot.to_json()?)
        .with_context(|| format!("write {}", file.display()))?;
    done(format!(
        "Saved {} profiles, {} priority pairs to {}",
        snapshot.actuation_matrix.len(),
        snapshot.input_priority_pairs.len(),
        file.display()
    ));
    Ok(())
}

/// Validate a backup against the keyboard, then write all of it
pub fn restore(ctx: &Context, file: &Path) -> Result<()> {
    let json =
        std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let snapshot = HallEffectSnapshot::from_json(&json)
        .with_context(|| format!("parse backup {}", file.display()))?;

    let mut keyboard = open_loaded(ctx)?;
    match keyboard.restore(&snapshot) {
        Ok(()) => {}
        Err(e @ HallEffectError::Snapshot(_)) => {
            return Err(e).context("backup does not fit this keyboard, nothing written")
        }
        Err(e) => {
            return Err(e)
                .context("restore failed; the keyboard may hold a mix of old and new settings")
        }
    }
    done(format!("Restored {}", file.display()));
    Ok(())
}
