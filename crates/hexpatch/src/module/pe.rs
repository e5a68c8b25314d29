//! PE section table handling.
//!
//! Descriptor offsets are raw file offsets. The loader maps sections to
//! different virtual addresses, so every runtime access goes through the
//! section table to translate between the two address spaces.

use std::fs;
use std::path::Path;

use goblin::pe::PE;

use crate::error::{Error, Result};

/// One section header, reduced to the fields needed for translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub raw_offset: u64,
    pub raw_size: u64,
    pub virtual_address: u64,
    pub virtual_size: u64,
}

/// Raw file offset <-> RVA translation table for one module image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    sections: Vec<Section>,
}

impl SectionMap {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// A map where file offsets and RVAs coincide.
    ///
    /// Used for flat images that were never relocated by a loader.
    pub fn identity(len: u64) -> Self {
        Self::new(vec![Section {
            raw_offset: 0,
            raw_size: len,
            virtual_address: 0,
            virtual_size: len,
        }])
    }

    /// Parse the section table of a PE image
    pub fn from_pe_bytes(bytes: &[u8]) -> std::result::Result<Self, goblin::error::Error> {
        let pe = PE::parse(bytes)?;
        let sections = pe
            .sections
            .iter()
            .map(|s| Section {
                raw_offset: s.pointer_to_raw_data as u64,
                raw_size: s.size_of_raw_data as u64,
                virtual_address: s.virtual_address as u64,
                virtual_size: s.virtual_size as u64,
            })
            .collect();
        Ok(Self::new(sections))
    }

    /// Read and parse the section table of a PE file on disk
    pub fn from_pe_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::from_pe_bytes(&bytes).map_err(|e| Error::InvalidImage {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Translate a raw file offset into an RVA
    pub fn file_offset_to_rva(&self, offset: u64) -> Option<u64> {
        self.sections
            .iter()
            .find(|s| offset >= s.raw_offset && offset < s.raw_offset + s.raw_size)
            .map(|s| offset - s.raw_offset + s.virtual_address)
    }

    /// Translate an RVA back into a raw file offset
    pub fn rva_to_file_offset(&self, rva: u64) -> Option<u64> {
        self.sections
            .iter()
            .find(|s| rva >= s.virtual_address && rva < s.virtual_address + s.virtual_size)
            .map(|s| rva - s.virtual_address + s.raw_offset)
    }
}

/// Header values that tell builds of the same module apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageStamp {
    pub time_date_stamp: u32,
    pub entry_point: u32,
}

impl ImageStamp {
    pub fn from_pe_bytes(bytes: &[u8]) -> Option<Self> {
        let pe = PE::parse(bytes).ok()?;
        let entry_point = pe
            .header
            .optional_header
            .map(|h| h.standard_fields.address_of_entry_point as u32)?;
        Some(Self {
            time_date_stamp: pe.header.coff_header.time_date_stamp,
            entry_point,
        })
    }

    /// Identifier used to name per-build descriptor files,
    /// e.g. `LDJ-5f1e0c2a_8b4c10`
    pub fn identifier(&self, model: &str) -> String {
        format!(
            "{}-{:x}_{:x}",
            model, self.time_date_stamp, self.entry_point
        )
    }
}

/// Compute the image identifier of a module file, if it is a valid PE
pub fn image_identifier<P: AsRef<Path>>(model: &str, path: P) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    ImageStamp::from_pe_bytes(&bytes).map(|stamp| stamp.identifier(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> SectionMap {
        SectionMap::new(vec![
            Section {
                raw_offset: 0x400,
                raw_size: 0x1000,
                virtual_address: 0x1000,
                virtual_size: 0x0f80,
            },
            Section {
                raw_offset: 0x1400,
                raw_size: 0x200,
                virtual_address: 0x3000,
                virtual_size: 0x400,
            },
        ])
    }

    #[test]
    fn test_file_offset_to_rva() {
        let map = sample_map();
        assert_eq!(map.file_offset_to_rva(0x400), Some(0x1000));
        assert_eq!(map.file_offset_to_rva(0x500), Some(0x1100));
        assert_eq!(map.file_offset_to_rva(0x1450), Some(0x3050));
        // Header area and beyond the last section are unmapped
        assert_eq!(map.file_offset_to_rva(0x100), None);
        assert_eq!(map.file_offset_to_rva(0x1600), None);
    }

    #[test]
    fn test_rva_to_file_offset() {
        let map = sample_map();
        assert_eq!(map.rva_to_file_offset(0x1100), Some(0x500));
        assert_eq!(map.rva_to_file_offset(0x3050), Some(0x1450));
        assert_eq!(map.rva_to_file_offset(0x2000), None);
    }

    #[test]
    fn test_identity_map() {
        let map = SectionMap::identity(64);
        assert_eq!(map.file_offset_to_rva(10), Some(10));
        assert_eq!(map.rva_to_file_offset(63), Some(63));
        assert_eq!(map.file_offset_to_rva(64), None);
    }

    #[test]
    fn test_identifier_format() {
        let stamp = ImageStamp {
            time_date_stamp: 0x5f1e0c2a,
            entry_point: 0x8b4c10,
        };
        assert_eq!(stamp.identifier("LDJ"), "LDJ-5f1e0c2a_8b4c10");
    }

    #[test]
    fn test_non_pe_has_no_stamp() {
        assert!(ImageStamp::from_pe_bytes(b"not a portable executable").is_none());

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0u8; 128]).unwrap();
        assert!(image_identifier("LDJ", file.path()).is_none());
        assert!(SectionMap::from_pe_file(file.path()).is_err());
    }
}
