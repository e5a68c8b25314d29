//! The patch engine.
//!
//! `PatchEngine` owns the catalog, the persisted state and the image
//! backend, and exposes the operations a host UI or CLI drives.

mod sources;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

pub use sources::{TargetModule, append_file, append_text, image_file_path, load_sources};

use crate::catalog::{Catalog, CatalogBuilder, CatalogSnapshot, SourceKind, lock};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::memory::{AccessMode, FileImage, ImageAccess, LiveImage};
use crate::module::{ModuleLocator, SystemHost, image_identifier};
use crate::patch::{
    DescriptorRecord, HardApplyReport, PatchDescriptor, PatchKind, PatchStatus, PatchType, apply, evaluate,
    hard_apply,
};
use crate::state::PatchState;

#[cfg(feature = "remote")]
use crate::remote::{ImportOutcome, RemoteImport};

/// Point-in-time view of one patch, as shown to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchView {
    pub hash: String,
    pub name: String,
    pub description: String,
    pub caution: Option<String>,
    #[serde(rename = "type")]
    pub patch_type: PatchType,
    pub preset: bool,
    pub enabled: bool,
    pub status: PatchStatus,
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(i64, i64)>,
}

impl From<&PatchDescriptor> for PatchView {
    fn from(descriptor: &PatchDescriptor) -> Self {
        let mut view = PatchView {
            hash: descriptor.hash.clone(),
            name: descriptor.header.name.clone(),
            description: descriptor.header.description.clone(),
            caution: descriptor.header.caution.clone(),
            patch_type: descriptor.declared_type,
            preset: descriptor.header.preset,
            enabled: descriptor.enabled,
            status: descriptor.status,
            reason: descriptor.error_reason(),
            variants: Vec::new(),
            selected_variant: None,
            value: None,
            range: None,
        };
        match &descriptor.kind {
            PatchKind::Memory(_) => {}
            PatchKind::Union(edit) => {
                view.variants = edit.variants.iter().map(|v| v.name.clone()).collect();
                view.selected_variant = edit.selected.clone();
            }
            PatchKind::Integer(edit) => {
                view.value = Some(edit.value);
                view.range = Some((edit.min, edit.max));
            }
        }
        view
    }
}

pub struct PatchEngine {
    config: EngineConfig,
    locator: Arc<ModuleLocator>,
    access: Arc<dyn ImageAccess>,
    catalog: Catalog,
    state: Mutex<PatchState>,
    reloading: Mutex<()>,
}

impl PatchEngine {
    /// Create an engine on the system module host; the backend follows
    /// `config.mode`
    pub fn new(config: EngineConfig) -> Result<Self> {
        let locator = Arc::new(ModuleLocator::new(&config.module_dir, Arc::new(SystemHost)).with_aliases(&config.aliases));
        let access: Arc<dyn ImageAccess> = match config.mode {
            AccessMode::Live => Arc::new(LiveImage::new(Arc::clone(&locator))),
            AccessMode::Offline => Arc::new(FileImage::new(Arc::clone(&locator))),
        };
        Self::with_access(config, locator, access)
    }

    /// Create an engine on an explicit locator and backend
    pub fn with_access(config: EngineConfig, locator: Arc<ModuleLocator>, access: Arc<dyn ImageAccess>) -> Result<Self> {
        let state = match &config.state_path {
            Some(path) => PatchState::load_from_path(path)?,
            None => PatchState::default(),
        };
        Ok(Self {
            config,
            locator,
            access,
            catalog: Catalog::new(),
            state: Mutex::new(state),
            reloading: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locator(&self) -> &ModuleLocator {
        &self.locator
    }

    pub fn access(&self) -> &dyn ImageAccess {
        self.access.as_ref()
    }

    pub fn catalog(&self) -> Arc<CatalogSnapshot> {
        self.catalog.snapshot()
    }

    /// Copy of the in-memory state
    pub fn state(&self) -> PatchState {
        lock(&self.state).clone()
    }

    pub fn auto_apply(&self) -> bool {
        lock(&self.state).auto_apply_for(&self.config.build.key)
    }

    pub fn set_auto_apply(&self, enabled: bool) {
        lock(&self.state).set_auto_apply(&self.config.build.key, enabled);
    }

    /// Main module and companions with their image identifiers
    pub fn target_modules(&self) -> Vec<TargetModule> {
        self.config
            .target_modules()
            .into_iter()
            .map(|name| {
                let name = self.locator.canonical_name(&name);
                let identifier = image_identifier(&self.config.build.model, self.locator.path(&name));
                TargetModule { name, identifier }
            })
            .collect()
    }

    /// Rebuild the catalog from the configured sources.
    ///
    /// With `apply`, enabled patches are activated when auto-apply is on for
    /// the running build. Returns the number of descriptors.
    pub fn reload(&self, apply: bool) -> usize {
        let _reloading = lock(&self.reloading);
        self.access.reset();

        let targets = self.target_modules();
        let identifiers: Vec<String> = targets.iter().filter_map(|t| t.identifier.clone()).collect();
        for target in &targets {
            debug!(
                "Target module {} ({})",
                target.name,
                target.identifier.as_deref().unwrap_or("no identifier")
            );
        }

        let state = self.state();
        let mut builder = CatalogBuilder::new(
            self.access.as_ref(),
            &self.locator,
            &state,
            &self.config.build,
            &identifiers,
        );
        load_sources(
            &mut builder,
            &targets,
            &self.config.patches_dir,
            &self.config.shared_catalogs,
            self.config.bundled.as_deref(),
        );
        self.publish(builder, apply, &state)
    }

    /// Replace the catalog with explicitly supplied records
    pub fn load_records(&self, records: Vec<DescriptorRecord>, kind: &SourceKind, apply: bool) -> usize {
        let _reloading = lock(&self.reloading);
        let identifiers: Vec<String> = self
            .target_modules()
            .into_iter()
            .filter_map(|t| t.identifier)
            .collect();
        let state = self.state();
        let mut builder = CatalogBuilder::new(
            self.access.as_ref(),
            &self.locator,
            &state,
            &self.config.build,
            &identifiers,
        );
        builder.append(records, kind, "supplied records");
        self.publish(builder, apply, &state)
    }

    fn publish(&self, builder: CatalogBuilder<'_>, apply: bool, state: &PatchState) -> usize {
        let snapshot = self.catalog.publish(builder.finish());
        if apply && state.auto_apply_for(&self.config.build.key) {
            let applied = snapshot.auto_apply(self.access.as_ref());
            info!("Auto applied {} patch(es)", applied);
        }
        snapshot.len()
    }

    /// Notify the engine that the host loaded a module. Target modules
    /// trigger a reload with auto-apply; returns whether one happened.
    pub fn on_module_loaded(&self, name: &str) -> bool {
        // Hosts report full paths in their own platform's form
        let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let is_target = self.config.target_modules().iter().any(|module| {
            module.eq_ignore_ascii_case(file_name) || self.locator.canonical_name(module).eq_ignore_ascii_case(file_name)
        });
        if !is_target {
            return false;
        }
        info!("Target module {} loaded, reloading patches", file_name);
        self.reload(true);
        true
    }

    /// Evaluate every patch
    pub fn poll(&self) -> Vec<PatchView> {
        let snapshot = self.catalog.snapshot();
        snapshot
            .entries()
            .iter()
            .map(|entry| {
                let mut descriptor = lock(entry);
                evaluate(&mut descriptor, self.access.as_ref());
                PatchView::from(&*descriptor)
            })
            .collect()
    }

    /// Look up a patch by hash or name
    pub fn find(&self, query: &str) -> Option<PatchView> {
        let snapshot = self.catalog.snapshot();
        snapshot.find(query).map(|entry| {
            let mut descriptor = lock(entry);
            evaluate(&mut descriptor, self.access.as_ref());
            PatchView::from(&*descriptor)
        })
    }

    fn with_patch<R>(&self, query: &str, f: impl FnOnce(&mut PatchDescriptor) -> Result<R>) -> Result<R> {
        let snapshot = self.catalog.snapshot();
        let entry = snapshot
            .find(query)
            .ok_or_else(|| Error::PatchNotFound(query.to_string()))?;
        let mut descriptor = lock(entry);
        let result = f(&mut descriptor)?;
        evaluate(&mut descriptor, self.access.as_ref());
        lock(&self.state).record(&descriptor, self.access.mode());
        Ok(result)
    }

    /// Write a patch's target bytes. Offline, a failed write still records
    /// the desired state.
    fn activate(&self, descriptor: &mut PatchDescriptor, on: bool) -> bool {
        let applied = apply(descriptor, self.access.as_ref(), on);
        if applied || self.access.mode() == AccessMode::Offline {
            descriptor.enabled = on;
            return true;
        }
        false
    }

    /// Enable or disable a patch; returns whether the change took effect
    pub fn set_enabled(&self, query: &str, on: bool) -> Result<bool> {
        let changed = self.with_patch(query, |descriptor| Ok(self.activate(descriptor, on)))?;
        if changed && on {
            self.set_auto_apply(true);
        }
        Ok(changed)
    }

    /// Select and activate a union variant
    pub fn select_variant(&self, query: &str, variant: &str) -> Result<bool> {
        let changed = self.with_patch(query, |descriptor| {
            let name = descriptor.name().to_string();
            let PatchKind::Union(edit) = &mut descriptor.kind else {
                return Err(Error::InvalidDescriptor(format!("{} is not a union patch", name)));
            };
            let Some(found) = edit.variant(variant) else {
                return Err(Error::InvalidDescriptor(format!("{} has no variant {}", name, variant)));
            };
            edit.selected = Some(found.name.clone());
            Ok(self.activate(descriptor, true))
        })?;
        if changed {
            self.set_auto_apply(true);
        }
        Ok(changed)
    }

    /// Set and activate the value of an integer patch; out of range values
    /// are clamped
    pub fn set_integer_value(&self, query: &str, value: i64) -> Result<bool> {
        let changed = self.with_patch(query, |descriptor| {
            let name = descriptor.name().to_string();
            let PatchKind::Integer(edit) = &mut descriptor.kind else {
                return Err(Error::InvalidDescriptor(format!("{} is not a number patch", name)));
            };
            let clamped = edit.clamp(value);
            if clamped != value {
                warn!("{}: {} clamped to {}", name, value, clamped);
            }
            edit.value = clamped;
            Ok(self.activate(descriptor, true))
        })?;
        if changed {
            self.set_auto_apply(true);
        }
        Ok(changed)
    }

    /// Disable every enabled patch; returns how many were disabled
    pub fn disable_all(&self) -> usize {
        let snapshot = self.catalog.snapshot();
        let mut disabled = 0;
        for entry in snapshot.entries() {
            let mut descriptor = lock(entry);
            let status = evaluate(&mut descriptor, self.access.as_ref());
            if !descriptor.enabled && status != PatchStatus::Enabled {
                continue;
            }
            if self.activate(&mut descriptor, false) {
                disabled += 1;
            }
            evaluate(&mut descriptor, self.access.as_ref());
            lock(&self.state).record(&descriptor, self.access.mode());
        }
        info!("Disabled {} patch(es)", disabled);
        disabled
    }

    /// Record every patch into the state and write it to the state file.
    /// Memory patches that were not evaluated since the last reload keep
    /// their saved entry.
    pub fn save_state(&self) -> Result<()> {
        // Collect first; descriptors are never locked while the state is
        let descriptors = self.catalog.snapshot().descriptors();
        let mut state = lock(&self.state);
        for descriptor in &descriptors {
            state.record(descriptor, self.access.mode());
        }
        match &self.config.state_path {
            Some(path) => state.save_to_path(path),
            None => {
                debug!("No state path configured, state kept in memory");
                Ok(())
            }
        }
    }

    /// Write the current patch state into the module files, then reload
    pub fn hard_apply(&self) -> HardApplyReport {
        let descriptors = self.catalog.snapshot().descriptors();
        let report = hard_apply(&descriptors, &self.locator);
        self.reload(false);
        report
    }

    /// Start importing descriptor files for the target modules from `url`
    #[cfg(feature = "remote")]
    pub fn start_import(&self, url: &str) -> Result<RemoteImport> {
        let identifiers: Vec<String> = self
            .target_modules()
            .into_iter()
            .filter_map(|t| t.identifier)
            .collect();
        if identifiers.is_empty() {
            return Err(Error::InvalidDescriptor(
                "no target module has an image identifier".to_string(),
            ));
        }
        RemoteImport::spawn(url, identifiers, self.config.patches_dir.clone())
    }

    /// Remember the URL of a successful import and reload; returns the
    /// number of descriptors after the reload
    #[cfg(feature = "remote")]
    pub fn finish_import(&self, outcome: &ImportOutcome) -> Option<usize> {
        if !outcome.is_success() {
            return None;
        }
        lock(&self.state).push_url(&outcome.url);
        Some(self.reload(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use region::Protection;

    use crate::config::BuildTarget;
    use crate::memory::live::test_support::{HeapHost, peek};
    use crate::module::{LoadedModule, SectionMap};

    const SHARED: &str = r#"[
        { "name": "Jump", "description": "skip", "gameCode": "ABC", "dateCode": 150, "type": "memory",
          "patches": [{ "offset": 16, "dllName": "game.dll", "dataDisabled": "7405", "dataEnabled": "EB05" }] },
        { "name": "Mode", "description": "", "gameCode": "ABC", "dateCode": 150, "type": "union",
          "patches": [
            { "name": "A", "patch": { "dllName": "game.dll", "data": "00", "offset": 32 } },
            { "name": "B", "patch": { "dllName": "game.dll", "data": "01", "offset": 32 } }
          ] },
        { "name": "Timer", "description": "", "gameCode": "ABC", "dateCode": 150, "type": "number",
          "patch": { "dllName": "game.dll", "offset": 48, "min": 0, "max": 1000, "size": 2 } }
    ]"#;

    fn image() -> Vec<u8> {
        let mut image = vec![0u8; 0x100];
        image[16..18].copy_from_slice(&[0x74, 0x05]);
        image[32] = 0x05;
        image[48..50].copy_from_slice(&250u16.to_le_bytes());
        image
    }

    fn config(dir: &Path, mode: AccessMode) -> EngineConfig {
        EngineConfig::builder()
            .build_target(BuildTarget::new("ABC", 150))
            .main_module("game.dll")
            .module_dir(dir)
            .patches_dir(dir.join("patches"))
            .shared_catalogs(vec![dir.join("patches.json")])
            .state_path(dir.join("state.json"))
            .mode(mode)
            .build()
    }

    fn live_engine(dir: &Path) -> (Arc<HeapHost>, LoadedModule, PatchEngine) {
        fs::write(dir.join("game.dll"), image()).unwrap();
        fs::write(dir.join("patches.json"), SHARED).unwrap();
        let host = Arc::new(HeapHost::default());
        let loaded = host.map("game.dll", image());
        let locator = Arc::new(ModuleLocator::new(dir, host.clone()));
        locator.insert_section_map("game.dll", SectionMap::identity(0x100));
        let access = Arc::new(LiveImage::new(Arc::clone(&locator)).with_protection(Protection::READ_WRITE));
        let engine = PatchEngine::with_access(config(dir, AccessMode::Live), locator, access).unwrap();
        (host, loaded, engine)
    }

    fn hash_of(engine: &PatchEngine, name: &str) -> String {
        engine.find(name).unwrap().hash
    }

    #[test]
    fn test_reload_from_shared_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, engine) = live_engine(dir.path());

        assert_eq!(engine.reload(false), 3);
        assert_eq!(
            engine.catalog().sources(),
            &[dir.path().join("patches.json").display().to_string()]
        );

        let views = engine.poll();
        assert_eq!(views[0].status, PatchStatus::Disabled);
        assert_eq!(views[1].status, PatchStatus::Error);
        assert_eq!(views[1].reason.as_deref(), Some("no match found in union"));
        assert_eq!(views[2].value, Some(250));
        assert_eq!(views[2].range, Some((0, 1000)));
    }

    #[test]
    fn test_toggle_and_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (host, loaded, engine) = live_engine(dir.path());
        engine.reload(false);

        assert!(engine.set_enabled("jump", true).unwrap());
        assert_eq!(peek(loaded, 16, 2), vec![0xeb, 0x05]);
        assert!(engine.select_variant("Mode", "B").unwrap());
        assert_eq!(peek(loaded, 32, 1), vec![0x01]);
        assert!(engine.set_integer_value("Timer", 5000).unwrap());
        assert_eq!(peek(loaded, 48, 2), 1000u16.to_le_bytes().to_vec());
        assert!(engine.auto_apply());
        engine.save_state().unwrap();

        // A fresh process image gets everything back on load
        let jump = hash_of(&engine, "Jump");
        drop(engine);
        host.unmap("game.dll");
        let loaded = host.map("game.dll", image());
        let locator = Arc::new(ModuleLocator::new(dir.path(), host.clone()));
        locator.insert_section_map("game.dll", SectionMap::identity(0x100));
        let access = Arc::new(LiveImage::new(Arc::clone(&locator)).with_protection(Protection::READ_WRITE));
        let engine = PatchEngine::with_access(config(dir.path(), AccessMode::Live), locator, access).unwrap();

        assert!(engine.state().patches_enabled.contains(&jump));
        engine.reload(true);
        assert_eq!(peek(loaded, 16, 2), vec![0xeb, 0x05]);
        assert_eq!(peek(loaded, 32, 1), vec![0x01]);
        assert_eq!(peek(loaded, 48, 2), 1000u16.to_le_bytes().to_vec());

        assert_eq!(engine.disable_all(), 3);
        assert_eq!(peek(loaded, 16, 2), vec![0x74, 0x05]);
        assert_eq!(peek(loaded, 32, 1), vec![0x05]);
        assert_eq!(peek(loaded, 48, 2), 250u16.to_le_bytes().to_vec());
    }

    #[test]
    fn test_unknown_patch_and_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, engine) = live_engine(dir.path());
        engine.reload(false);

        assert!(matches!(engine.set_enabled("nope", true), Err(Error::PatchNotFound(_))));
        assert!(matches!(
            engine.select_variant("Jump", "A"),
            Err(Error::InvalidDescriptor(_))
        ));
        assert!(matches!(
            engine.select_variant("Mode", "Z"),
            Err(Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_on_module_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, engine) = live_engine(dir.path());

        assert!(!engine.on_module_loaded("other.dll"));
        assert!(engine.catalog().is_empty());
        assert!(engine.on_module_loaded(r"C:\Games\GAME.DLL"));
        assert_eq!(engine.catalog().len(), 3);
    }

    #[test]
    fn test_bundled_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, engine) = live_engine(dir.path());

        // A shared catalog without matching patches falls through to bundled
        fs::write(dir.path().join("patches.json"), "[]").unwrap();
        let bundled = r#"[{ "name": "Bundled", "description": "", "gameCode": "ABC", "dateCode": 150,
            "type": "memory", "patches": [{ "offset": 16, "dllName": "game.dll",
            "dataDisabled": "7405", "dataEnabled": "EB05" }] }]"#;
        let mut config = engine.config().clone();
        config.bundled = Some(bundled.to_string());
        let locator = Arc::new(ModuleLocator::new(dir.path(), Arc::new(SystemHost)));
        let access = Arc::new(FileImage::new(Arc::clone(&locator)));
        let engine = PatchEngine::with_access(config, locator, access).unwrap();

        assert_eq!(engine.reload(false), 1);
        assert_eq!(engine.catalog().sources(), &["bundled patches".to_string()]);
    }

    #[test]
    fn test_load_records() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, loaded, engine) = live_engine(dir.path());
        engine.set_auto_apply(true);
        engine.reload(false);
        let jump = hash_of(&engine, "Jump");
        lock(&engine.state).patches_enabled.insert(jump);

        let records = crate::patch::parse_catalog(SHARED).unwrap().records;
        assert_eq!(engine.load_records(records, &SourceKind::Bundled, true), 3);
        assert_eq!(peek(loaded, 16, 2), vec![0xeb, 0x05]);
    }

    #[test]
    fn test_offline_error_records_desired_state() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game.dll"), vec![0u8; 0x40]).unwrap();
        fs::write(
            dir.path().join("patches.json"),
            r#"[{ "name": "Far", "description": "", "gameCode": "ABC", "dateCode": 150, "type": "memory",
                "patches": [{ "offset": 4096, "dllName": "game.dll", "dataDisabled": "00", "dataEnabled": "01" }] }]"#,
        )
        .unwrap();
        let engine = PatchEngine::new(config(dir.path(), AccessMode::Offline)).unwrap();
        engine.reload(false);
        assert_eq!(engine.poll()[0].status, PatchStatus::Error);

        assert!(engine.set_enabled("Far", true).unwrap());
        engine.save_state().unwrap();
        let saved = PatchState::load_from_path(dir.path().join("state.json")).unwrap();
        assert!(saved.patches_enabled.contains(&hash_of(&engine, "Far")));
    }

    #[test]
    fn test_enabled_patch_survives_later_runs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game.dll"), image()).unwrap();
        fs::write(dir.path().join("patches.json"), SHARED).unwrap();
        let saved = || PatchState::load_from_path(dir.path().join("state.json")).unwrap();

        let engine = PatchEngine::new(config(dir.path(), AccessMode::Offline)).unwrap();
        engine.reload(false);
        assert!(engine.set_enabled("Jump", true).unwrap());
        engine.save_state().unwrap();
        let jump = hash_of(&engine, "Jump");
        drop(engine);

        // A later run changes another patch and never looks at Jump
        let engine = PatchEngine::new(config(dir.path(), AccessMode::Offline)).unwrap();
        engine.reload(false);
        assert!(engine.set_integer_value("Timer", 300).unwrap());
        engine.save_state().unwrap();
        assert!(saved().patches_enabled.contains(&jump));
        drop(engine);

        // Reloading with apply writes restored patches into the file copies
        let engine = PatchEngine::new(config(dir.path(), AccessMode::Offline)).unwrap();
        engine.reload(true);
        let views = engine.poll();
        assert_eq!(views[0].status, PatchStatus::Enabled);
        assert_eq!(views[2].value, Some(300));
        engine.save_state().unwrap();
        assert!(saved().patches_enabled.contains(&jump));
        assert_eq!(saved().integer_patches_enabled.values().collect::<Vec<_>>(), vec![&300]);

        // Only hard apply touches the module file
        assert_eq!(&fs::read(dir.path().join("game.dll")).unwrap()[16..18], &[0x74, 0x05]);
    }

    #[test]
    fn test_hard_apply_reloads() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game.dll"), image()).unwrap();
        fs::write(dir.path().join("patches.json"), SHARED).unwrap();
        let engine = PatchEngine::new(config(dir.path(), AccessMode::Offline)).unwrap();
        engine.reload(false);

        assert!(engine.set_enabled("Jump", true).unwrap());
        let jump = hash_of(&engine, "Jump");
        let report = engine.hard_apply();
        assert_eq!(report.files_written.len(), 1);
        assert_eq!(&fs::read(dir.path().join("game.dll")).unwrap()[16..18], &[0xeb, 0x05]);

        // Saving right after the reload keeps what was written
        engine.save_state().unwrap();
        let saved = PatchState::load_from_path(dir.path().join("state.json")).unwrap();
        assert!(saved.patches_enabled.contains(&jump));
        assert_eq!(engine.find("Jump").unwrap().status, PatchStatus::Enabled);
    }
}
