use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::host::{LoadedModule, ModuleHost};
use super::pe::SectionMap;
use crate::error::PatchFault;
use crate::memory::Location;

/// Everything known about one module name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
    pub loaded: Option<LoadedModule>,
}

/// Resolves module names to files on disk and to loaded images.
///
/// Section tables are parsed lazily from the on-disk file and cached per
/// module name for the lifetime of the locator.
pub struct ModuleLocator {
    module_dir: PathBuf,
    aliases: HashMap<String, String>,
    host: Arc<dyn ModuleHost>,
    sections: Mutex<HashMap<String, Arc<SectionMap>>>,
}

impl ModuleLocator {
    pub fn new<P: Into<PathBuf>>(module_dir: P, host: Arc<dyn ModuleHost>) -> Self {
        Self {
            module_dir: module_dir.into(),
            aliases: HashMap::new(),
            host,
            sections: Mutex::new(HashMap::new()),
        }
    }

    /// Register module renames, e.g. a modded build shipping `bm2dx.dll`
    /// under a different file name.
    pub fn with_aliases(mut self, aliases: &HashMap<String, String>) -> Self {
        self.aliases = aliases
            .iter()
            .map(|(from, to)| (from.to_ascii_lowercase(), to.clone()))
            .collect();
        self
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Apply an alias when the aliased file is actually present
    pub fn canonical_name(&self, name: &str) -> String {
        match self.aliases.get(&name.to_ascii_lowercase()) {
            Some(alias) if self.path(alias).exists() => {
                debug!("Module alias: {} -> {}", name, alias);
                alias.clone()
            }
            _ => name.to_string(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.module_dir.join(name)
    }

    pub fn resolve(&self, name: &str) -> ModuleInfo {
        let path = self.path(name);
        ModuleInfo {
            name: name.to_string(),
            exists: path.exists(),
            loaded: self.host.loaded_module(name).ok(),
            path,
        }
    }

    pub fn loaded(&self, name: &str) -> Result<LoadedModule, PatchFault> {
        self.host.loaded_module(name)
    }

    /// Section table of a module, parsed from its on-disk file
    pub fn section_map(&self, name: &str) -> Option<Arc<SectionMap>> {
        let key = name.to_ascii_lowercase();
        let mut sections = self.sections.lock().ok()?;
        if let Some(map) = sections.get(&key) {
            return Some(Arc::clone(map));
        }

        match SectionMap::from_pe_file(self.path(name)) {
            Ok(map) => {
                let map = Arc::new(map);
                sections.insert(key, Arc::clone(&map));
                Some(map)
            }
            Err(e) => {
                warn!("Failed to read section table of {}: {}", name, e);
                None
            }
        }
    }

    /// Seed the section cache, bypassing the on-disk PE parse
    pub fn insert_section_map(&self, name: &str, map: SectionMap) {
        if let Ok(mut sections) = self.sections.lock() {
            sections.insert(name.to_ascii_lowercase(), Arc::new(map));
        }
    }

    /// Map a raw file offset of a module onto its loaded image.
    ///
    /// The returned location is relative to the module base, which is
    /// looked up again on every access.
    pub fn file_offset_to_runtime(
        &self,
        name: &str,
        file_offset: u64,
        len: usize,
    ) -> Result<Location, PatchFault> {
        if !self.path(name).exists() {
            return Err(PatchFault::ModuleNotFound(name.to_string()));
        }

        let loaded = self.loaded(name)?;

        let rva = self
            .section_map(name)
            .and_then(|map| map.file_offset_to_rva(file_offset))
            .ok_or_else(|| PatchFault::RvaNotFound {
                module: name.to_string(),
                offset: file_offset,
            })?;

        if rva + len as u64 >= loaded.image_size as u64 {
            return Err(PatchFault::OffsetOutOfBounds {
                offset: rva,
                len,
                limit: loaded.image_size as u64,
            });
        }

        Ok(Location {
            module: name.to_string(),
            offset: rva,
            len,
        })
    }
}
