use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::PatchFault;

/// Path of the backup written before the first hard apply of a file
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Cache of unmodified module files.
///
/// A `.bak` copy takes precedence over the file itself, since the file may
/// already carry hard-applied patches.
#[derive(Debug, Default)]
pub struct PristineFiles {
    files: Mutex<HashMap<PathBuf, Arc<Vec<u8>>>>,
}

impl PristineFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, PatchFault> {
        let bytes = self.load(path)?;
        let start = offset as usize;
        let end = start.saturating_add(len);
        if end > bytes.len() {
            return Err(PatchFault::OffsetOutOfBounds {
                offset,
                len,
                limit: bytes.len() as u64,
            });
        }
        Ok(bytes[start..end].to_vec())
    }

    pub fn clear(&self) {
        if let Ok(mut files) = self.files.lock() {
            files.clear();
        }
    }

    fn load(&self, path: &Path) -> Result<Arc<Vec<u8>>, PatchFault> {
        let not_found = || PatchFault::ModuleNotFound(path.display().to_string());
        let mut files = self.files.lock().map_err(|_| not_found())?;
        if let Some(bytes) = files.get(path) {
            return Ok(Arc::clone(bytes));
        }

        let backup = backup_path(path);
        let source = if backup.exists() { backup } else { path.to_path_buf() };
        let bytes = match fs::read(&source) {
            Ok(bytes) => Arc::new(bytes),
            Err(e) => {
                warn!("Failed to read {}: {}", source.display(), e);
                return Err(not_found());
            }
        };
        debug!("Cached pristine copy of {} ({} bytes)", source.display(), bytes.len());
        files.insert(path.to_path_buf(), Arc::clone(&bytes));
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("modules/game.dll")),
            PathBuf::from("modules/game.dll.bak")
        );
    }

    #[test]
    fn test_prefers_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.dll");
        fs::write(&path, [9u8, 9, 9, 9]).unwrap();

        let files = PristineFiles::new();
        assert_eq!(files.read(&path, 1, 2).unwrap(), vec![9, 9]);

        fs::write(backup_path(&path), [1u8, 2, 3, 4]).unwrap();
        // cached until cleared
        assert_eq!(files.read(&path, 1, 2).unwrap(), vec![9, 9]);
        files.clear();
        assert_eq!(files.read(&path, 1, 2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_bounds_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.dll");
        fs::write(&path, [0u8; 4]).unwrap();

        let files = PristineFiles::new();
        assert!(matches!(
            files.read(&path, 3, 2),
            Err(PatchFault::OffsetOutOfBounds { .. })
        ));
        assert!(matches!(
            files.read(&dir.path().join("missing.dll"), 0, 1),
            Err(PatchFault::ModuleNotFound(_))
        ));
    }
}
