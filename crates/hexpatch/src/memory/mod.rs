//! Byte access to module images.
//!
//! Two backends implement [`ImageAccess`]:
//! - [`LiveImage`]: the module mapped into the current process, written
//!   under a scoped protection guard
//! - [`FileImage`]: an in-memory copy of the module file, used when
//!   configuring patches without running the target

mod file;
mod guard;
pub(crate) mod live;
mod pristine;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PatchFault;
use crate::module::SectionMap;

pub use file::FileImage;
pub use guard::ProtectedRegion;
pub use live::LiveImage;
pub use pristine::{PristineFiles, backup_path};

/// Which backend a patch engine operates on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Patch the module loaded into this process
    #[default]
    Live,
    /// Evaluate and toggle against cached file copies
    Offline,
}

/// A resolved byte range inside a module.
///
/// `offset` is an RVA for live access and a raw file offset for offline
/// access. The module base is never stored; it is looked up again on each
/// access so a reloaded module cannot leave a dangling address behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub module: String,
    pub offset: u64,
    pub len: usize,
}

/// Coordinate system of a haystack
#[derive(Debug, Clone)]
pub enum AddressSpace {
    /// Haystack positions are raw file offsets
    File,
    /// Haystack positions are RVAs of a loaded image
    Image(Arc<SectionMap>),
}

/// A full copy of a module, searched by the signature scanner
#[derive(Debug, Clone)]
pub struct Haystack {
    bytes: Vec<u8>,
    space: AddressSpace,
}

impl Haystack {
    pub fn file(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            space: AddressSpace::File,
        }
    }

    pub fn image(bytes: Vec<u8>, sections: Arc<SectionMap>) -> Self {
        Self {
            bytes,
            space: AddressSpace::Image(sections),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    /// Convert a haystack position into a raw file offset
    pub fn to_file_offset(&self, position: u64) -> Option<u64> {
        match &self.space {
            AddressSpace::File => Some(position),
            AddressSpace::Image(sections) => sections.rva_to_file_offset(position),
        }
    }
}

/// Read/write access to module bytes addressed by raw file offset
pub trait ImageAccess: Send + Sync {
    fn mode(&self) -> AccessMode;

    /// Resolve a file offset range into a location this backend can access
    fn locate(&self, module: &str, file_offset: u64, len: usize) -> Result<Location, PatchFault>;

    /// Read `location.len` bytes
    fn read(&self, location: &Location) -> Result<Vec<u8>, PatchFault>;

    /// Write `bytes` at the start of `location`; `bytes` may be shorter
    /// than the location but never longer
    fn write(&self, location: &Location, bytes: &[u8]) -> Result<(), PatchFault>;

    /// Copy of the whole module for signature scanning
    fn haystack(&self, module: &str) -> Result<Haystack, PatchFault>;

    /// Unmodified on-disk bytes of a range
    fn pristine(&self, module: &str, file_offset: u64, len: usize) -> Result<Vec<u8>, PatchFault>;

    /// Drop cached file contents before a catalog reload
    fn reset(&self) {}
}

pub(crate) fn check_write_len(location: &Location, bytes: &[u8]) -> Result<(), PatchFault> {
    if bytes.len() > location.len {
        return Err(PatchFault::OffsetOutOfBounds {
            offset: location.offset,
            len: bytes.len(),
            limit: location.offset + location.len as u64,
        });
    }
    Ok(())
}
