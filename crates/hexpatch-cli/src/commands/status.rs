//! Status command implementation.

use anyhow::Result;
use hexpatch::{PatchEngine, PatchStatus, PatchView};
use owo_colors::OwoColorize;

fn short_hash(view: &PatchView) -> &str {
    view.hash.get(..8).unwrap_or(&view.hash)
}

fn detail(view: &PatchView) -> String {
    if let Some((min, max)) = view.range {
        return format!("= {} [{}, {}]", view.value.unwrap_or_default(), min, max);
    }
    if !view.variants.is_empty() {
        let variants: Vec<String> = view
            .variants
            .iter()
            .map(|name| {
                if view.selected_variant.as_deref() == Some(name.as_str()) {
                    format!("*{}", name)
                } else {
                    name.clone()
                }
            })
            .collect();
        return format!("({})", variants.join(" | "));
    }
    String::new()
}

/// Run the status command
pub fn run(engine: &PatchEngine, json: bool) -> Result<()> {
    let views = engine.poll();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    let catalog = engine.catalog();
    println!("Build: {}", engine.config().build.key);
    println!("Sources: {}", catalog.sources().join(", "));
    println!(
        "Auto-apply: {}",
        if engine.auto_apply() { "on" } else { "off" }
    );
    println!();

    if views.is_empty() {
        println!("No patches loaded.");
        return Ok(());
    }

    for view in &views {
        let status = match view.status {
            PatchStatus::Enabled => "ON ".green().to_string(),
            PatchStatus::Disabled => "OFF".dimmed().to_string(),
            PatchStatus::Error => "ERR".red().to_string(),
        };
        println!(
            "[{}] {}  {} {}",
            status,
            short_hash(view).dimmed(),
            view.name,
            detail(view)
        );
        if let Some(caution) = &view.caution {
            println!("      {}", caution.yellow());
        }
        if let Some(reason) = &view.reason {
            println!("      {}", reason.red());
        }
    }

    let enabled = views.iter().filter(|v| v.status == PatchStatus::Enabled).count();
    let errors = views.iter().filter(|v| v.status == PatchStatus::Error).count();
    println!();
    println!("{} patches, {} enabled, {} errors", views.len(), enabled, errors);
    Ok(())
}
