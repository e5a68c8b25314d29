//! Import command implementation.

use anyhow::{Result, bail};
use hexpatch::PatchEngine;

/// Run the import command
pub fn run(engine: &PatchEngine, url: &str) -> Result<()> {
    let import = engine.start_import(url)?;
    println!("Fetching descriptor files from {}...", url);

    let outcome = import.wait();
    for path in &outcome.saved {
        println!("Saved {}", path.display());
    }
    for (identifier, error) in &outcome.failed {
        eprintln!("Failed to fetch {}: {}", identifier, error);
    }

    match engine.finish_import(&outcome) {
        Some(count) => {
            engine.save_state()?;
            println!("Loaded {} patch(es)", count);
            Ok(())
        }
        None => bail!("No descriptor files could be imported from {}", url),
    }
}
