//! Identify command implementation.

use anyhow::Result;
use hexpatch::PatchEngine;

/// Run the identify command
pub fn run(engine: &PatchEngine) -> Result<()> {
    for target in engine.target_modules() {
        let path = engine.locator().path(&target.name);
        match &target.identifier {
            Some(identifier) => println!("{:<20} {}", target.name, identifier),
            None if path.exists() => println!("{:<20} (not a PE image)", target.name),
            None => println!("{:<20} (missing: {})", target.name, path.display()),
        }
    }
    Ok(())
}
