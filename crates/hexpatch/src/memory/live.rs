use std::ptr;
use std::sync::Arc;

use region::Protection;
use tracing::debug;

use super::guard::ProtectedRegion;
use super::pristine::PristineFiles;
use super::{AccessMode, Haystack, ImageAccess, Location, check_write_len};
use crate::error::PatchFault;
use crate::module::ModuleLocator;

/// Access to modules loaded into the current process
pub struct LiveImage {
    locator: Arc<ModuleLocator>,
    pristine: PristineFiles,
    protection: Protection,
}

impl LiveImage {
    pub fn new(locator: Arc<ModuleLocator>) -> Self {
        Self {
            locator,
            pristine: PristineFiles::new(),
            // Code pages must stay executable while other threads run them
            protection: Protection::READ_WRITE_EXECUTE,
        }
    }

    /// Override the protection applied while a range is accessed
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    fn open(&self, location: &Location) -> Result<ProtectedRegion, PatchFault> {
        let loaded = self.locator.loaded(&location.module)?;
        if location.offset + location.len as u64 >= loaded.image_size as u64 {
            return Err(PatchFault::OffsetOutOfBounds {
                offset: location.offset,
                len: location.len,
                limit: loaded.image_size as u64,
            });
        }

        let address = (loaded.base as u64 + location.offset) as usize as *mut u8;
        // SAFETY: the range was bounds checked against the image of a module
        // that the loader reports as mapped right now.
        unsafe { ProtectedRegion::open(address, location.len, self.protection) }
    }
}

impl ImageAccess for LiveImage {
    fn mode(&self) -> AccessMode {
        AccessMode::Live
    }

    fn locate(&self, module: &str, file_offset: u64, len: usize) -> Result<Location, PatchFault> {
        self.locator.file_offset_to_runtime(module, file_offset, len)
    }

    fn read(&self, location: &Location) -> Result<Vec<u8>, PatchFault> {
        Ok(self.open(location)?.read())
    }

    fn write(&self, location: &Location, bytes: &[u8]) -> Result<(), PatchFault> {
        check_write_len(location, bytes)?;
        self.open(location)?.write(bytes);
        Ok(())
    }

    fn haystack(&self, module: &str) -> Result<Haystack, PatchFault> {
        let path = self.locator.path(module);
        if !path.exists() {
            return Err(PatchFault::ModuleNotFound(module.to_string()));
        }

        let mapped = self
            .locator
            .loaded(module)
            .ok()
            .and_then(|loaded| Some((loaded, self.locator.section_map(module)?)));
        if let Some((loaded, sections)) = mapped {
            let bytes = copy_readable(loaded.base, loaded.image_size)?;
            return Ok(Haystack::image(bytes, sections));
        }

        // Not mapped yet: the file layout gives the same file offsets
        debug!("{} not loaded, scanning file contents", module);
        std::fs::read(&path)
            .map(Haystack::file)
            .map_err(|_| PatchFault::ModuleNotFound(module.to_string()))
    }

    fn pristine(&self, module: &str, file_offset: u64, len: usize) -> Result<Vec<u8>, PatchFault> {
        self.pristine.read(&self.locator.path(module), file_offset, len)
    }

    fn reset(&self) {
        self.pristine.clear();
    }
}

/// Copy `base..base + len` page region by page region. Regions that are
/// not readable, or are guard pages, read as zeroes.
fn copy_readable(base: usize, len: usize) -> Result<Vec<u8>, PatchFault> {
    let mut bytes = vec![0u8; len];
    let end = base.saturating_add(len);
    let regions = region::query_range(base as *const u8, len).map_err(|e| {
        debug!("Failed to query memory at {:#x}: {}", base, e);
        PatchFault::BadAddress
    })?;

    let mut skipped = 0;
    for region in regions.flatten() {
        let range = region.as_range();
        let start = range.start.max(base);
        let stop = range.end.min(end);
        if start >= stop {
            continue;
        }
        if !region.is_readable() || region.is_guarded() {
            skipped += stop - start;
            continue;
        }
        // SAFETY: the range lies in a region the OS reports as readable and
        // within the destination buffer.
        unsafe { ptr::copy_nonoverlapping(start as *const u8, bytes[start - base..].as_mut_ptr(), stop - start) };
    }
    if skipped > 0 {
        debug!("Skipped {} unreadable byte(s) at {:#x}", skipped, base);
    }
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::module::{LoadedModule, ModuleHost, SectionMap};

    /// Module host serving leaked heap buffers as loaded images
    #[derive(Default)]
    pub struct HeapHost {
        modules: Mutex<HashMap<String, LoadedModule>>,
    }

    impl HeapHost {
        /// Map `image` as module `name`; the buffer is leaked for the test
        pub fn map(&self, name: &str, image: Vec<u8>) -> LoadedModule {
            let image_size = image.len();
            let buffer: &'static mut [u8] = Box::leak(image.into_boxed_slice());
            let loaded = LoadedModule {
                base: buffer.as_mut_ptr() as usize,
                image_size,
            };
            self.modules
                .lock()
                .unwrap()
                .insert(name.to_ascii_lowercase(), loaded);
            loaded
        }

        pub fn unmap(&self, name: &str) {
            self.modules.lock().unwrap().remove(&name.to_ascii_lowercase());
        }
    }

    impl ModuleHost for HeapHost {
        fn loaded_module(&self, name: &str) -> Result<LoadedModule, PatchFault> {
            self.modules
                .lock()
                .unwrap()
                .get(&name.to_ascii_lowercase())
                .copied()
                .ok_or_else(|| PatchFault::ModuleNotLoaded(name.to_string()))
        }
    }

    /// Read bytes straight out of a mapped test image
    pub fn peek(loaded: LoadedModule, offset: usize, len: usize) -> Vec<u8> {
        // SAFETY: test images are leaked and never freed.
        unsafe { std::slice::from_raw_parts((loaded.base + offset) as *const u8, len) }.to_vec()
    }

    /// A live backend over a module that is identical on disk and in memory
    pub fn live_fixture(dir: &Path, name: &str, image: Vec<u8>) -> (Arc<HeapHost>, LoadedModule, LiveImage) {
        std::fs::write(dir.join(name), &image).unwrap();
        let host = Arc::new(HeapHost::default());
        let loaded = host.map(name, image.clone());
        let locator = Arc::new(ModuleLocator::new(dir, host.clone()));
        locator.insert_section_map(name, SectionMap::identity(image.len() as u64));
        let live = LiveImage::new(locator).with_protection(Protection::READ_WRITE);
        (host, loaded, live)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::memory::AddressSpace;

    fn image() -> Vec<u8> {
        (0u8..64).collect()
    }

    #[test]
    fn test_read_write_live() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, loaded, live) = live_fixture(dir.path(), "game.dll", image());

        let location = live.locate("game.dll", 0x10, 4).unwrap();
        assert_eq!(live.read(&location).unwrap(), vec![0x10, 0x11, 0x12, 0x13]);

        live.write(&location, &[0xde, 0xad]).unwrap();
        assert_eq!(peek(loaded, 0x10, 4), vec![0xde, 0xad, 0x12, 0x13]);

        assert!(live.write(&location, &[0; 5]).is_err());
    }

    #[test]
    fn test_unloaded_module() {
        let dir = tempfile::tempdir().unwrap();
        let (host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());
        let location = live.locate("game.dll", 0x10, 4).unwrap();

        host.unmap("game.dll");
        assert_eq!(
            live.read(&location),
            Err(PatchFault::ModuleNotLoaded("game.dll".into()))
        );

        // Signature scans fall back to the file while the module is unmapped
        let haystack = live.haystack("game.dll").unwrap();
        assert!(matches!(haystack.space(), AddressSpace::File));
        assert_eq!(haystack.bytes(), image().as_slice());
    }

    #[test]
    fn test_haystack_from_image() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());
        let haystack = live.haystack("game.dll").unwrap();
        assert!(matches!(haystack.space(), AddressSpace::Image(_)));
        assert_eq!(haystack.bytes().len(), 64);
        assert_eq!(haystack.to_file_offset(33), Some(33));
    }

    #[test]
    fn test_unreadable_pages_read_as_zero() {
        let page = region::page::size();
        let mut pages = region::alloc(page * 3, Protection::READ_WRITE).unwrap();
        let base = pages.as_mut_ptr::<u8>();
        // SAFETY: the allocation spans three writable pages.
        unsafe { std::ptr::write_bytes(base, 0xcc, page * 3) };
        // SAFETY: the middle page belongs to the allocation.
        unsafe { region::protect(base.wrapping_add(page), page, Protection::NONE) }.unwrap();

        let bytes = copy_readable(base as usize, page * 3).unwrap();
        assert_eq!(bytes.len(), page * 3);
        assert!(bytes[..page].iter().all(|&b| b == 0xcc));
        assert!(bytes[page..page * 2].iter().all(|&b| b == 0));
        assert!(bytes[page * 2..].iter().all(|&b| b == 0xcc));

        // A range starting inside a region is copied from its start
        let tail = copy_readable(base as usize + page * 2 + 16, 32).unwrap();
        assert_eq!(tail, vec![0xcc; 32]);
    }

    #[test]
    fn test_pristine_comes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());
        let location = live.locate("game.dll", 0x20, 2).unwrap();
        live.write(&location, &[0, 0]).unwrap();
        assert_eq!(live.pristine("game.dll", 0x20, 2).unwrap(), vec![0x20, 0x21]);
    }
}
