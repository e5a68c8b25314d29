//! Command line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "hexpatch")]
#[command(about = "Binary patch manager for game modules", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "hexpatch.toml", env = "HEXPATCH_CONFIG")]
    pub config: PathBuf,

    /// Game code of the target build (overrides config)
    #[arg(long)]
    pub model: Option<String>,

    /// Date code of the target build (overrides config)
    #[arg(long)]
    pub date_code: Option<i32>,

    /// Main module file name (overrides config)
    #[arg(long)]
    pub main_module: Option<String>,

    /// Directory containing the target modules (overrides config)
    #[arg(long, env = "HEXPATCH_MODULE_DIR")]
    pub module_dir: Option<PathBuf>,

    /// Directory holding per-build descriptor files (overrides config)
    #[arg(long)]
    pub patches_dir: Option<PathBuf>,

    /// Patch state file (overrides config)
    #[arg(long)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List patches and their status
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Enable a patch by hash or name
    Enable { patch: String },

    /// Disable a patch by hash or name
    Disable {
        patch: Option<String>,

        /// Disable every patch
        #[arg(long, conflicts_with = "patch")]
        all: bool,
    },

    /// Select a variant of a union patch
    Select { patch: String, variant: String },

    /// Set the value of a number patch
    Set {
        patch: String,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Write the configured patches into the module files
    HardApply {
        /// Write without asking for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Import per-build descriptor files from a server
    Import { url: String },

    /// Print the image identifiers of the target modules
    Identify,

    /// Search a module file for a byte pattern (e.g. "74 ?? 8B 45")
    Scan {
        /// Module file name, relative to the module directory
        module: String,

        pattern: String,

        /// Maximum number of matches to print
        #[arg(short, long, default_value_t = 16)]
        limit: usize,
    },

    /// Turn auto-apply on or off for the target build
    AutoApply {
        #[arg(value_enum)]
        switch: Switch,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}
