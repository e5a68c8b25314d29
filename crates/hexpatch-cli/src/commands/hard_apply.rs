//! Hard apply command implementation.

use anyhow::{Result, bail};
use hexpatch::PatchEngine;
use owo_colors::OwoColorize;

/// Run the hard-apply command
pub fn run(engine: &PatchEngine, yes: bool) -> Result<()> {
    let views = engine.poll();
    let enabled: Vec<_> = views.iter().filter(|v| v.enabled).collect();

    println!("Patches to write:");
    for view in &enabled {
        println!("  {}", view.name);
    }
    if enabled.is_empty() {
        println!("  (none; disabled bytes of memory patches are still restored)");
    }

    if !yes {
        println!();
        println!("Module files will be modified; a .bak copy is kept of each.");
        println!("Re-run with --yes to write.");
        return Ok(());
    }

    let report = engine.hard_apply();
    for backup in &report.backups_created {
        println!("Backup: {}", backup.display());
    }
    for path in &report.files_written {
        println!("{} {}", "Wrote".green(), path.display());
    }
    for skipped in &report.skipped {
        println!("{} {}: {}", "Skipped".yellow(), skipped.name, skipped.reason);
    }
    for failure in &report.failures {
        println!("{} {}: {}", "Failed".red(), failure.path.display(), failure.error);
    }
    println!("{} write(s)", report.writes);

    engine.save_state()?;
    if !report.failures.is_empty() {
        bail!("{} module file(s) could not be written", report.failures.len());
    }
    Ok(())
}
