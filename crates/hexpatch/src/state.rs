//! Persisted patch state.
//!
//! Everything is keyed by identity hash, so state survives reloads and
//! builds that share patches, and entries for patches that are not part of
//! the current catalog are carried through untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::memory::AccessMode;
use crate::patch::{PatchDescriptor, PatchKind, PatchStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchState {
    /// Build keys for which enabled patches are applied on load
    #[serde(default)]
    pub auto_apply: BTreeSet<String>,
    /// Hashes of enabled memory and signature patches
    #[serde(default)]
    pub patches_enabled: BTreeSet<String>,
    /// Hash -> selected variant of enabled union patches
    #[serde(default)]
    pub union_patches_enabled: BTreeMap<String, String>,
    /// Hash -> value of enabled integer patches
    #[serde(default)]
    pub integer_patches_enabled: BTreeMap<String, i64>,
    /// Remote descriptor URLs that were imported successfully
    #[serde(default)]
    pub remote_url_history: Vec<String>,
}

impl PatchState {
    /// Load state from a file; a missing file yields empty state
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No patch state at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let state: PatchState = serde_json::from_str(&content)?;
        debug!(
            "Loaded patch state: {} plain, {} union, {} integer",
            state.patches_enabled.len(),
            state.union_patches_enabled.len(),
            state.integer_patches_enabled.len()
        );
        Ok(state)
    }

    /// Save state to a file, creating parent directories
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved patch state to {}", path.display());
        Ok(())
    }

    pub fn auto_apply_for(&self, build_key: &str) -> bool {
        self.auto_apply.contains(build_key)
    }

    pub fn set_auto_apply(&mut self, build_key: &str, enabled: bool) {
        if enabled {
            self.auto_apply.insert(build_key.to_string());
        } else {
            self.auto_apply.remove(build_key);
        }
    }

    pub fn push_url(&mut self, url: &str) {
        self.remote_url_history.retain(|u| u != url);
        self.remote_url_history.push(url.to_string());
    }

    /// Restore the enabled flag, variant and value of a freshly built
    /// descriptor
    pub fn restore(&self, descriptor: &mut PatchDescriptor) {
        let hash = descriptor.hash.as_str();
        match &mut descriptor.kind {
            PatchKind::Memory(_) => {
                descriptor.enabled = self.patches_enabled.contains(hash);
            }
            PatchKind::Union(edit) => {
                if let Some(variant) = self.union_patches_enabled.get(hash) {
                    descriptor.enabled = true;
                    edit.selected = Some(variant.clone());
                }
            }
            PatchKind::Integer(edit) => {
                if let Some(&value) = self.integer_patches_enabled.get(hash) {
                    descriptor.enabled = true;
                    edit.value = edit.clamp(value);
                }
            }
        }
    }

    /// Record the state of one descriptor.
    ///
    /// Union and integer entries follow `enabled`. Memory patches are only
    /// recorded from an observed status, so a patch that was never
    /// evaluated, or whose bytes could not be checked, keeps its previous
    /// entry; offline, the desired state of an unverifiable patch is
    /// recorded instead.
    pub fn record(&mut self, descriptor: &PatchDescriptor, mode: AccessMode) {
        let hash = descriptor.hash.clone();
        match &descriptor.kind {
            PatchKind::Union(edit) => match (&edit.selected, descriptor.enabled) {
                (Some(variant), true) => {
                    self.union_patches_enabled.insert(hash, variant.clone());
                }
                _ => {
                    self.union_patches_enabled.remove(&hash);
                }
            },
            PatchKind::Integer(edit) => {
                if descriptor.enabled {
                    self.integer_patches_enabled.insert(hash, edit.value);
                } else {
                    self.integer_patches_enabled.remove(&hash);
                }
            }
            PatchKind::Memory(_) if !descriptor.observed => {}
            PatchKind::Memory(_) => {
                let offline_error = mode == AccessMode::Offline && descriptor.status == PatchStatus::Error;
                let on = descriptor.enabled
                    && (descriptor.status == PatchStatus::Enabled || offline_error);
                let off = descriptor.status == PatchStatus::Disabled
                    || (offline_error && !descriptor.enabled);
                if on {
                    self.patches_enabled.insert(hash);
                } else if off {
                    self.patches_enabled.remove(&hash);
                }
            }
        }
    }
}
