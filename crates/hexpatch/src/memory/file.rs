use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::pristine::PristineFiles;
use super::{AccessMode, Haystack, ImageAccess, Location, check_write_len};
use crate::error::PatchFault;
use crate::module::ModuleLocator;

/// Offline access: module files are read once and patched in memory.
///
/// Nothing is written back to disk here; hard apply does that.
pub struct FileImage {
    locator: Arc<ModuleLocator>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    pristine: PristineFiles,
}

impl FileImage {
    pub fn new(locator: Arc<ModuleLocator>) -> Self {
        Self {
            locator,
            files: Mutex::new(HashMap::new()),
            pristine: PristineFiles::new(),
        }
    }

    fn with_file<R>(&self, module: &str, f: impl FnOnce(&mut Vec<u8>) -> R) -> Result<R, PatchFault> {
        let not_found = || PatchFault::ModuleNotFound(module.to_string());
        let mut files = self.files.lock().map_err(|_| not_found())?;
        let key = module.to_ascii_lowercase();

        if !files.contains_key(&key) {
            let path = self.locator.path(module);
            let bytes = fs::read(&path).map_err(|e| {
                warn!("Failed to read {}: {}", path.display(), e);
                not_found()
            })?;
            debug!("Cached file copy of {} ({} bytes)", module, bytes.len());
            files.insert(key.clone(), bytes);
        }

        files.get_mut(&key).map(f).ok_or_else(not_found)
    }

    fn bounds(location: &Location, file_len: usize) -> Result<std::ops::Range<usize>, PatchFault> {
        let start = location.offset as usize;
        let end = start.saturating_add(location.len);
        if end > file_len {
            return Err(PatchFault::OffsetOutOfBounds {
                offset: location.offset,
                len: location.len,
                limit: file_len as u64,
            });
        }
        Ok(start..end)
    }
}

impl ImageAccess for FileImage {
    fn mode(&self) -> AccessMode {
        AccessMode::Offline
    }

    fn locate(&self, module: &str, file_offset: u64, len: usize) -> Result<Location, PatchFault> {
        let location = Location {
            module: module.to_string(),
            offset: file_offset,
            len,
        };
        let file_len = self.with_file(module, |bytes| bytes.len())?;
        Self::bounds(&location, file_len)?;
        Ok(location)
    }

    fn read(&self, location: &Location) -> Result<Vec<u8>, PatchFault> {
        self.with_file(&location.module, |bytes| {
            Self::bounds(location, bytes.len()).map(|range| bytes[range].to_vec())
        })?
    }

    fn write(&self, location: &Location, data: &[u8]) -> Result<(), PatchFault> {
        check_write_len(location, data)?;
        self.with_file(&location.module, |bytes| {
            let range = Self::bounds(location, bytes.len())?;
            bytes[range.start..range.start + data.len()].copy_from_slice(data);
            Ok(())
        })?
    }

    fn haystack(&self, module: &str) -> Result<Haystack, PatchFault> {
        self.with_file(module, |bytes| Haystack::file(bytes.clone()))
    }

    fn pristine(&self, module: &str, file_offset: u64, len: usize) -> Result<Vec<u8>, PatchFault> {
        self.pristine.read(&self.locator.path(module), file_offset, len)
    }

    fn reset(&self) {
        if let Ok(mut files) = self.files.lock() {
            files.clear();
        }
        self.pristine.clear();
    }
}
