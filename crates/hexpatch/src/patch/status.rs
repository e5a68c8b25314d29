//! Status evaluation.
//!
//! The status of a patch is never stored between polls; it is derived from
//! the bytes currently present at its sites.

use tracing::debug;

use super::descriptor::{IntegerEdit, MemoryEdit, PatchDescriptor, PatchKind, PatchStatus, UnionEdit};
use super::integer::decode_le;
use crate::error::PatchFault;
use crate::memory::ImageAccess;

/// Evaluate a descriptor and store the result in its `status` and `error`
pub fn evaluate(descriptor: &mut PatchDescriptor, access: &dyn ImageAccess) -> PatchStatus {
    let mirrored = if descriptor.enabled {
        PatchStatus::Enabled
    } else {
        PatchStatus::Disabled
    };

    let result = match &mut descriptor.kind {
        PatchKind::Memory(edits) => memory_status(edits, access),
        PatchKind::Union(edit) => union_status(edit, access).map(|_| mirrored),
        PatchKind::Integer(edit) => integer_status(edit, access).map(|_| mirrored),
    };

    match result {
        Ok(status) => {
            descriptor.status = status;
            descriptor.error = None;
        }
        Err(fault) => {
            descriptor.status = PatchStatus::Error;
            descriptor.error = Some(fault);
        }
    }
    descriptor.observed = true;
    descriptor.status
}

/// Whether one edit currently holds its enabled (`true`) or disabled bytes
pub(crate) fn edit_state(edit: &MemoryEdit, access: &dyn ImageAccess) -> Result<bool, PatchFault> {
    let location = edit.site.resolve(access, &edit.module, edit.file_offset, edit.len())?;
    let live = access.read(&location)?;
    if live.starts_with(&edit.enabled) {
        Ok(true)
    } else if live.starts_with(&edit.disabled) {
        Ok(false)
    } else {
        Err(PatchFault::NeitherOnNorOff)
    }
}

fn memory_status(edits: &[MemoryEdit], access: &dyn ImageAccess) -> Result<PatchStatus, PatchFault> {
    let mut any_enabled = false;
    let mut any_disabled = false;
    for edit in edits {
        if edit_state(edit, access)? {
            any_enabled = true;
        } else {
            any_disabled = true;
        }
    }

    match (any_enabled, any_disabled) {
        (true, true) => Err(PatchFault::BothOnAndOff),
        (true, false) => Ok(PatchStatus::Enabled),
        (false, true) => Ok(PatchStatus::Disabled),
        (false, false) => Err(PatchFault::NeitherOnNorOff),
    }
}

fn union_status(edit: &mut UnionEdit, access: &dyn ImageAccess) -> Result<(), PatchFault> {
    let location = edit.site.resolve(access, &edit.module, edit.file_offset, edit.len)?;
    let live = access.read(&location)?;

    let mut matching = edit.variants.iter().filter(|v| v.bytes == live);
    let first = matching.next().ok_or(PatchFault::NoUnionMatch)?;
    let extra = matching.count();
    if extra > 0 {
        debug!("{} variants share the live bytes, taking {}", extra + 1, first.name);
    }

    edit.selected = Some(first.name.clone());
    Ok(())
}

fn integer_status(edit: &mut IntegerEdit, access: &dyn ImageAccess) -> Result<(), PatchFault> {
    let location = edit.site.resolve(access, &edit.module, edit.file_offset, edit.size)?;
    let live = access.read(&location)?;
    let value = decode_le(&live);
    if !edit.in_range(value) {
        return Err(PatchFault::ValueOutOfRange {
            value,
            min: edit.min,
            max: edit.max,
        });
    }
    edit.value = value;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::super::descriptor::{PatchHeader, PatchType, SiteCache, UnionVariant};
    use super::*;

    pub fn header(name: &str) -> PatchHeader {
        PatchHeader {
            name: name.into(),
            description: String::new(),
            game_code: "ABC".into(),
            ..Default::default()
        }
    }

    pub fn memory_patch(edits: Vec<MemoryEdit>) -> PatchDescriptor {
        PatchDescriptor::new(header("memory"), PatchKind::Memory(edits), PatchType::Memory, "m".into())
    }

    pub fn union_patch(file_offset: u64, variants: &[(&str, &[u8])]) -> PatchDescriptor {
        let edit = UnionEdit {
            module: "game.dll".into(),
            file_offset,
            len: variants[0].1.len(),
            variants: variants
                .iter()
                .map(|(name, bytes)| UnionVariant {
                    name: name.to_string(),
                    bytes: bytes.to_vec(),
                })
                .collect(),
            selected: None,
            site: SiteCache::default(),
        };
        PatchDescriptor::new(header("union"), PatchKind::Union(edit), PatchType::Union, "u".into())
    }

    pub fn integer_patch(file_offset: u64, size: usize, min: i64, max: i64) -> PatchDescriptor {
        let edit = IntegerEdit {
            module: "game.dll".into(),
            file_offset,
            size,
            min,
            max,
            value: 0,
            site: SiteCache::default(),
        };
        PatchDescriptor::new(header("integer"), PatchKind::Integer(edit), PatchType::Integer, "i".into())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::memory::live::test_support::live_fixture;

    fn image() -> Vec<u8> {
        let mut image = vec![0u8; 0x2000];
        image[0x10..0x12].copy_from_slice(&[0x74, 0x05]);
        image[0x20..0x22].copy_from_slice(&[0xeb, 0x05]);
        image[0x40..0x42].copy_from_slice(&[0x3c, 0x00]);
        image[0x1000..0x1002].copy_from_slice(&250u16.to_le_bytes());
        image
    }

    #[test]
    fn test_memory_status() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());

        let mut off = memory_patch(vec![MemoryEdit::new("game.dll", 0x10, vec![0x74, 0x05], vec![0xeb, 0x05])]);
        assert!(!off.observed);
        assert_eq!(evaluate(&mut off, &live), PatchStatus::Disabled);
        assert!(off.observed);

        let mut on = memory_patch(vec![MemoryEdit::new("game.dll", 0x20, vec![0x74, 0x05], vec![0xeb, 0x05])]);
        assert_eq!(evaluate(&mut on, &live), PatchStatus::Enabled);

        let mut mixed = memory_patch(vec![
            MemoryEdit::new("game.dll", 0x10, vec![0x74, 0x05], vec![0xeb, 0x05]),
            MemoryEdit::new("game.dll", 0x20, vec![0x74, 0x05], vec![0xeb, 0x05]),
        ]);
        assert_eq!(evaluate(&mut mixed, &live), PatchStatus::Error);
        assert_eq!(mixed.error, Some(PatchFault::BothOnAndOff));

        let mut neither = memory_patch(vec![MemoryEdit::new("game.dll", 0x30, vec![0x74], vec![0xeb])]);
        assert_eq!(evaluate(&mut neither, &live), PatchStatus::Error);
        assert_eq!(neither.error, Some(PatchFault::NeitherOnNorOff));

        let mut empty = memory_patch(vec![]);
        assert_eq!(evaluate(&mut empty, &live), PatchStatus::Error);
    }

    #[test]
    fn test_out_of_bounds_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());

        let mut patch = memory_patch(vec![MemoryEdit::new("game.dll", 0x1ffe, vec![0, 0], vec![1, 1])]);
        assert_eq!(evaluate(&mut patch, &live), PatchStatus::Error);
        assert!(matches!(patch.error, Some(PatchFault::OffsetOutOfBounds { .. })));
        assert!(patch.error_reason().is_some());
    }

    #[test]
    fn test_union_status() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());

        let mut patch = union_patch(0x40, &[("Default", &[0x3c, 0x00]), ("Off", &[0, 0]), ("Long", &[0x78, 0])]);
        assert_eq!(evaluate(&mut patch, &live), PatchStatus::Disabled);
        let PatchKind::Union(edit) = &patch.kind else { unreachable!() };
        assert_eq!(edit.selected.as_deref(), Some("Default"));

        patch.enabled = true;
        assert_eq!(evaluate(&mut patch, &live), PatchStatus::Enabled);

        let mut none = union_patch(0x40, &[("A", &[1, 1]), ("B", &[2, 2])]);
        assert_eq!(evaluate(&mut none, &live), PatchStatus::Error);
        assert_eq!(none.error, Some(PatchFault::NoUnionMatch));

        // Variants sharing a payload resolve to the first one declared
        let mut shared = union_patch(0x40, &[("Off", &[0, 0]), ("A", &[0x3c, 0]), ("B", &[0x3c, 0])]);
        assert_eq!(evaluate(&mut shared, &live), PatchStatus::Disabled);
        assert!(shared.error.is_none());
        let PatchKind::Union(edit) = &shared.kind else { unreachable!() };
        assert_eq!(edit.selected.as_deref(), Some("A"));
    }

    #[test]
    fn test_integer_status() {
        let dir = tempfile::tempdir().unwrap();
        let (_host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());

        let mut patch = integer_patch(0x1000, 2, 0, 1000);
        assert_eq!(evaluate(&mut patch, &live), PatchStatus::Disabled);
        let PatchKind::Integer(edit) = &patch.kind else { unreachable!() };
        assert_eq!(edit.value, 250);

        let mut narrow = integer_patch(0x1000, 2, 0, 100);
        assert_eq!(evaluate(&mut narrow, &live), PatchStatus::Error);
        assert_eq!(
            narrow.error,
            Some(PatchFault::ValueOutOfRange {
                value: 250,
                min: 0,
                max: 100
            })
        );
    }

    #[test]
    fn test_transient_errors_recover() {
        let dir = tempfile::tempdir().unwrap();
        let (host, _loaded, live) = live_fixture(dir.path(), "game.dll", image());
        host.unmap("game.dll");

        let mut patch = memory_patch(vec![MemoryEdit::new("game.dll", 0x10, vec![0x74, 0x05], vec![0xeb, 0x05])]);
        assert_eq!(evaluate(&mut patch, &live), PatchStatus::Error);
        assert_eq!(patch.error, Some(PatchFault::ModuleNotLoaded("game.dll".into())));

        host.map("game.dll", image());
        assert_eq!(evaluate(&mut patch, &live), PatchStatus::Disabled);
        assert!(patch.error.is_none());
    }
}
