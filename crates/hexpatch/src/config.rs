//! Engine configuration.
//!
//! ## Example
//!
//! ```ignore
//! use hexpatch::config::{BuildTarget, EngineConfig};
//!
//! let config = EngineConfig::builder()
//!     .build_target(BuildTarget::new("LDJ", 2023091200))
//!     .main_module("bm2dx.dll")
//!     .module_dir("modules")
//!     .state_path("patch_state.json")
//!     .build();
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::memory::AccessMode;

/// Modules patched alongside a main module
const COMPANION_MODULES: &[(&str, &[&str])] = &[
    ("jubeat.dll", &["music_db.dll", "coin.dll"]),
    ("arkmdxp3.dll", &["gamemdx.dll"]),
    ("arkmdxp4.dll", &["gamemdx.dll"]),
    ("arkmdxbio2.dll", &["gamemdx.dll"]),
    ("arkndd.dll", &["gamendd.dll"]),
    ("arkkep.dll", &["game.dll"]),
    ("arkjc9.dll", &["gamejc9.dll"]),
    ("arkkdm.dll", &["gamekdm.dll"]),
    ("arkmmd.dll", &["gamemmd.dll"]),
    ("arkklp.dll", &["lpac.dll"]),
    ("arknck.dll", &["weac.dll"]),
    ("gdxg.dll", &["game.dll"]),
];

/// Module names that combined releases ship under a different file name
const RENAMED_MODULES: &[(&str, &[&str])] = &[("beatstream.dll", &["beatstream1.dll", "beatstream2.dll"])];

/// Companion modules of a main module
pub fn default_companions(main_module: &str) -> Vec<String> {
    COMPANION_MODULES
        .iter()
        .find(|(main, _)| main.eq_ignore_ascii_case(main_module))
        .map(|(_, extra)| extra.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

/// The build patches are matched against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Game code, e.g. "LDJ"
    pub model: String,
    /// Build date code, e.g. 2023091200
    pub date_code: i32,
    /// Key under which auto-apply is remembered
    pub key: String,
}

impl BuildTarget {
    pub fn new(model: impl Into<String>, date_code: i32) -> Self {
        let model = model.into();
        let key = format!("{}:{}", model, date_code);
        Self {
            model,
            date_code,
            key,
        }
    }

    /// Use a host-provided build key for auto-apply
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// Configuration for the patch engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub build: BuildTarget,
    /// Module the build is identified by
    pub main_module: String,
    /// Additional modules whose patches load together with the main module
    pub companions: Vec<String>,
    /// Descriptor module name -> file name actually present
    pub aliases: HashMap<String, String>,
    /// Directory containing the target modules
    pub module_dir: PathBuf,
    /// Directory holding `<identifier>.json` descriptor files
    pub patches_dir: PathBuf,
    /// Persisted patch state; nothing is saved when unset
    pub state_path: Option<PathBuf>,
    /// Shared `patches.json` files, tried in order
    pub shared_catalogs: Vec<PathBuf>,
    /// Descriptor text shipped with the host application
    pub bundled: Option<String>,
    pub mode: AccessMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let module_dir = PathBuf::from("modules");
        let patches_dir = PathBuf::from("patches");
        Self {
            build: BuildTarget::default(),
            main_module: String::new(),
            companions: Vec::new(),
            aliases: HashMap::new(),
            shared_catalogs: default_shared_catalogs(&module_dir, &patches_dir),
            module_dir,
            patches_dir,
            state_path: None,
            bundled: None,
            mode: AccessMode::Live,
        }
    }
}

fn default_shared_catalogs(module_dir: &std::path::Path, patches_dir: &std::path::Path) -> Vec<PathBuf> {
    vec![
        patches_dir.join("patches.json"),
        PathBuf::from("patches.json"),
        module_dir.join("patches.json"),
        PathBuf::from("../patches.json"),
    ]
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Main module followed by its companions
    pub fn target_modules(&self) -> Vec<String> {
        let mut modules = vec![self.main_module.clone()];
        for companion in &self.companions {
            if !modules.iter().any(|m| m.eq_ignore_ascii_case(companion)) {
                modules.push(companion.clone());
            }
        }
        modules.retain(|m| !m.is_empty());
        modules
    }
}

/// Builder for EngineConfig
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    build: Option<BuildTarget>,
    main_module: Option<String>,
    companions: Option<Vec<String>>,
    aliases: HashMap<String, String>,
    module_dir: Option<PathBuf>,
    patches_dir: Option<PathBuf>,
    state_path: Option<PathBuf>,
    shared_catalogs: Option<Vec<PathBuf>>,
    bundled: Option<String>,
    mode: Option<AccessMode>,
}

impl EngineConfigBuilder {
    pub fn build_target(mut self, build: BuildTarget) -> Self {
        self.build = Some(build);
        self
    }

    /// Set the main module; companions default from the built-in table
    pub fn main_module(mut self, name: impl Into<String>) -> Self {
        self.main_module = Some(name.into());
        self
    }

    /// Replace the companion module list
    pub fn companions(mut self, names: Vec<String>) -> Self {
        self.companions = Some(names);
        self
    }

    pub fn alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    pub fn module_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.module_dir = Some(path.into());
        self
    }

    pub fn patches_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.patches_dir = Some(path.into());
        self
    }

    pub fn state_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.state_path = Some(path.into());
        self
    }

    pub fn shared_catalogs(mut self, paths: Vec<PathBuf>) -> Self {
        self.shared_catalogs = Some(paths);
        self
    }

    pub fn bundled(mut self, text: impl Into<String>) -> Self {
        self.bundled = Some(text.into());
        self
    }

    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        let default = EngineConfig::default();
        let main_module = self.main_module.unwrap_or(default.main_module);
        let module_dir = self.module_dir.unwrap_or(default.module_dir);
        let patches_dir = self.patches_dir.unwrap_or(default.patches_dir);

        let mut aliases = self.aliases;
        for (name, releases) in RENAMED_MODULES {
            if releases.iter().any(|r| r.eq_ignore_ascii_case(&main_module)) {
                aliases
                    .entry(name.to_string())
                    .or_insert_with(|| main_module.clone());
            }
        }

        EngineConfig {
            build: self.build.unwrap_or(default.build),
            companions: self
                .companions
                .unwrap_or_else(|| default_companions(&main_module)),
            shared_catalogs: self
                .shared_catalogs
                .unwrap_or_else(|| default_shared_catalogs(&module_dir, &patches_dir)),
            main_module,
            aliases,
            module_dir,
            patches_dir,
            state_path: self.state_path.or(default.state_path),
            bundled: self.bundled,
            mode: self.mode.unwrap_or(default.mode),
        }
    }
}
