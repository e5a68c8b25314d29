mod cli;
mod commands;
mod config;

use anyhow::{Result, bail};
use clap::Parser;
use hexpatch::PatchEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::CliConfig;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hexpatch=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(&cli.config)?;
    config.apply_args(&cli);

    let open = || -> Result<PatchEngine> {
        let engine = PatchEngine::new(config.to_engine_config()?)?;
        // Restored patches are applied to the file copies so their status
        // reads back as saved
        let count = engine.reload(true);
        info!("{} patch(es) available", count);
        Ok(engine)
    };

    match cli.command {
        Command::Status { json } => commands::status::run(&open()?, json),
        Command::Enable { patch } => commands::toggle::enable(&open()?, &patch),
        Command::Disable { patch, all } => match (patch, all) {
            (_, true) => commands::toggle::disable_all(&open()?),
            (Some(patch), false) => commands::toggle::disable(&open()?, &patch),
            (None, false) => bail!("Name a patch or pass --all"),
        },
        Command::Select { patch, variant } => commands::toggle::select(&open()?, &patch, &variant),
        Command::Set { patch, value } => commands::toggle::set_value(&open()?, &patch, value),
        Command::HardApply { yes } => commands::hard_apply::run(&open()?, yes),
        Command::Import { url } => commands::import::run(&open()?, &url),
        Command::Identify => commands::identify::run(&open()?),
        Command::AutoApply { switch } => commands::toggle::auto_apply(&open()?, switch.is_on()),
        Command::Scan {
            module,
            pattern,
            limit,
        } => commands::scan::run(&config.module_dir(), &module, &pattern, limit),
    }
}
