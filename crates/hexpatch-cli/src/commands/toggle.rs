//! Commands that change patch state.
//!
//! Changes are made against cached file copies and persisted to the state
//! file; `hard-apply` writes them into the modules.

use anyhow::{Result, bail};
use hexpatch::PatchEngine;

fn report(engine: &PatchEngine, patch: &str, changed: bool) -> Result<()> {
    let view = engine.find(patch);
    let name = view.as_ref().map(|v| v.name.as_str()).unwrap_or(patch);
    if !changed {
        let reason = view
            .as_ref()
            .and_then(|v| v.reason.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Failed to change {}: {}", name, reason);
    }
    engine.save_state()?;
    println!("{}: {}", name, view.as_ref().map(|v| v.status).unwrap_or_default());
    Ok(())
}

pub fn enable(engine: &PatchEngine, patch: &str) -> Result<()> {
    let changed = engine.set_enabled(patch, true)?;
    report(engine, patch, changed)
}

pub fn disable(engine: &PatchEngine, patch: &str) -> Result<()> {
    let changed = engine.set_enabled(patch, false)?;
    report(engine, patch, changed)
}

pub fn disable_all(engine: &PatchEngine) -> Result<()> {
    let count = engine.disable_all();
    engine.save_state()?;
    println!("Disabled {} patch(es)", count);
    Ok(())
}

pub fn select(engine: &PatchEngine, patch: &str, variant: &str) -> Result<()> {
    let changed = engine.select_variant(patch, variant)?;
    report(engine, patch, changed)
}

pub fn set_value(engine: &PatchEngine, patch: &str, value: i64) -> Result<()> {
    let changed = engine.set_integer_value(patch, value)?;
    report(engine, patch, changed)?;
    if let Some(current) = engine.find(patch).and_then(|v| v.value) {
        if current != value {
            println!("Value clamped to {}", current);
        }
    }
    Ok(())
}

pub fn auto_apply(engine: &PatchEngine, enabled: bool) -> Result<()> {
    engine.set_auto_apply(enabled);
    engine.save_state()?;
    println!(
        "Auto-apply {} for {}",
        if enabled { "enabled" } else { "disabled" },
        engine.config().build.key
    );
    Ok(())
}
