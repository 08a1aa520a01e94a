//! Input priority pair commands.

use super::{done, open_loaded, Context};
use crate::cli::PairArgs;
use anyhow::{anyhow, Context as _, Result};
use crossterm::style::Stylize;
use vial_hall_effect::{InputPriorityPair, InputPriorityTable};

impl From<PairArgs> for InputPriorityPair {
    fn from(args: PairArgs) -> Self {
        Self {
            layer: args.layer,
            row_a: args.row_a,
            col_a: args.col_a,
            row_b: args.row_b,
            col_b: args.col_b,
            resolution: args.resolution,
        }
    }
}

pub fn list(ctx: &Context) -> Result<()> {
    let keyboard = open_loaded(ctx)?;
    let pairs = keyboard
        .priority_pairs()
        .ok_or_else(|| anyhow!("input priority pairs not loaded"))?;
    if pairs.is_empty() {
        println!("No input priority pairs");
        return Ok(());
    }
    println!(
        "{}",
        format!("Input priority pairs ({}/{})", pairs.len(), InputPriorityTable::CAPACITY).bold()
    );
    for (i, pair) in pairs.iter().enumerate() {
        println!("  [{i}] {pair}");
    }
    Ok(())
}

pub fn add(ctx: &Context, args: PairArgs) -> Result<()> {
    let mut keyboard = open_loaded(ctx)?;
    let pair = InputPriorityPair::from(args);
    let index = keyboard
        .append_priority_pair(pair)
        .context("append priority pair")?;
    done(format!("[{index}] {pair}"));
    Ok(())
}

pub fn replace(ctx: &Context, index: usize, args: PairArgs) -> Result<()> {
    let mut keyboard = open_loaded(ctx)?;
    let pair = InputPriorityPair::from(args);
    keyboard
        .replace_priority_pair(index, pair)
        .with_context(|| format!("replace priority pair {index}"))?;
    done(format!("[{index}] {pair}"));
    Ok(())
}

pub fn remove(ctx: &Context, index: usize) -> Result<()> {
    let mut keyboard = open_loaded(ctx)?;
    let removed = keyboard
        .remove_priority_pair(index)
        .with_context(|| format!("remove priority pair {index}"))?;
    done(format!("Removed [{index}] {removed}"));
    Ok(())
}
