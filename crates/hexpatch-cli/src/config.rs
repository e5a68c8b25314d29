//! `hexpatch.toml` handling.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hexpatch::{AccessMode, BuildTarget, EngineConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;

/// File-level configuration; every field may be overridden on the command
/// line
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Game code, e.g. "LDJ"
    pub model: Option<String>,
    pub date_code: Option<i32>,
    /// Auto-apply key; defaults to `<model>:<date_code>`
    pub build_key: Option<String>,
    pub main_module: Option<String>,
    pub companions: Option<Vec<String>>,
    pub aliases: HashMap<String, String>,
    pub module_dir: Option<PathBuf>,
    pub patches_dir: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
    pub shared_catalogs: Option<Vec<PathBuf>>,
    /// Descriptor file used when no other source has patches
    pub bundled: Option<PathBuf>,
}

impl CliConfig {
    /// Load a config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn apply_args(&mut self, cli: &Cli) {
        if let Some(model) = &cli.model {
            self.model = Some(model.clone());
        }
        if let Some(date_code) = cli.date_code {
            self.date_code = Some(date_code);
        }
        if let Some(main_module) = &cli.main_module {
            self.main_module = Some(main_module.clone());
        }
        if let Some(dir) = &cli.module_dir {
            self.module_dir = Some(dir.clone());
        }
        if let Some(dir) = &cli.patches_dir {
            self.patches_dir = Some(dir.clone());
        }
        if let Some(path) = &cli.state {
            self.state_path = Some(path.clone());
        }
    }

    pub fn module_dir(&self) -> PathBuf {
        self.module_dir.clone().unwrap_or_else(|| PathBuf::from("modules"))
    }

    /// Default state file under the user config directory
    pub fn default_state_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(config_dir.join("hexpatch").join("patch_state.json"))
    }

    /// Engine configuration for offline use
    pub fn to_engine_config(&self) -> Result<EngineConfig> {
        let model = self
            .model
            .clone()
            .context("No game code configured. Set `model` in hexpatch.toml or pass --model")?;
        let main_module = self
            .main_module
            .clone()
            .context("No main module configured. Set `main_module` in hexpatch.toml or pass --main-module")?;

        let mut build = BuildTarget::new(model, self.date_code.unwrap_or_default());
        if let Some(key) = &self.build_key {
            build = build.with_key(key.clone());
        }

        let state_path = match &self.state_path {
            Some(path) => path.clone(),
            None => Self::default_state_path()?,
        };

        let mut builder = EngineConfig::builder()
            .build_target(build)
            .main_module(main_module)
            .module_dir(self.module_dir())
            .state_path(state_path)
            .mode(AccessMode::Offline);
        if let Some(dir) = &self.patches_dir {
            builder = builder.patches_dir(dir.clone());
        }
        if let Some(companions) = &self.companions {
            builder = builder.companions(companions.clone());
        }
        if let Some(paths) = &self.shared_catalogs {
            builder = builder.shared_catalogs(paths.clone());
        }
        if let Some(path) = &self.bundled {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read bundled patches from {}", path.display()))?;
            builder = builder.bundled(text);
        }
        for (from, to) in &self.aliases {
            builder = builder.alias(from.clone(), to.clone());
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const CONFIG: &str = r#"
model = "LDJ"
date_code = 2023091200
main_module = "bm2dx.dll"
module_dir = "game/modules"
state_path = "state.json"

[aliases]
"bm2dx.dll" = "bm2dx_omni.dll"
"#;

    #[test]
    fn test_load_and_convert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hexpatch.toml");
        fs::write(&path, CONFIG).unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.model.as_deref(), Some("LDJ"));
        assert_eq!(config.aliases.get("bm2dx.dll").map(String::as_str), Some("bm2dx_omni.dll"));

        let engine = config.to_engine_config().unwrap();
        assert_eq!(engine.build.key, "LDJ:2023091200");
        assert_eq!(engine.module_dir, PathBuf::from("game/modules"));
        assert_eq!(engine.state_path, Some(PathBuf::from("state.json")));
        assert_eq!(engine.mode, AccessMode::Offline);
        assert_eq!(engine.patches_dir, PathBuf::from("patches"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert!(config.to_engine_config().is_err());
    }

    #[test]
    fn test_args_override_file() {
        let mut config: CliConfig = toml::from_str(CONFIG).unwrap();
        let cli = Cli::parse_from([
            "hexpatch",
            "--model",
            "KFC",
            "--date-code",
            "2024010100",
            "--state",
            "other.json",
            "status",
        ]);
        config.apply_args(&cli);

        assert_eq!(config.model.as_deref(), Some("KFC"));
        assert_eq!(config.date_code, Some(2024010100));
        assert_eq!(config.state_path, Some(PathBuf::from("other.json")));
        assert_eq!(config.main_module.as_deref(), Some("bm2dx.dll"));
    }

    #[test]
    fn test_bundled_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("bundled.json");
        fs::write(&bundled, "[]").unwrap();

        let mut config: CliConfig = toml::from_str(CONFIG).unwrap();
        config.bundled = Some(bundled);
        config.build_key = Some("custom".into());
        let engine = config.to_engine_config().unwrap();
        assert_eq!(engine.bundled.as_deref(), Some("[]"));
        assert_eq!(engine.build.key, "custom");

        config.bundled = Some(dir.path().join("missing.json"));
        assert!(config.to_engine_config().is_err());
    }
}
