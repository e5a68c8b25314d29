//! Patch activation and deactivation.

use tracing::{debug, warn};

use super::descriptor::{IntegerEdit, MemoryEdit, PatchDescriptor, PatchKind, UnionEdit};
use super::integer::encode_le;
use crate::error::PatchFault;
use crate::memory::{ImageAccess, Location};

/// Activate or deactivate a patch; failures are logged and reported as
/// `false`
pub fn apply(descriptor: &PatchDescriptor, access: &dyn ImageAccess, activate: bool) -> bool {
    match try_apply(descriptor, access, activate) {
        Ok(()) => true,
        Err(fault) => {
            warn!(
                "Failed to {} patch {}: {}",
                if activate { "enable" } else { "disable" },
                descriptor.name(),
                fault
            );
            false
        }
    }
}

pub fn try_apply(descriptor: &PatchDescriptor, access: &dyn ImageAccess, activate: bool) -> Result<(), PatchFault> {
    match &descriptor.kind {
        PatchKind::Memory(edits) => apply_memory(edits, access, activate),
        PatchKind::Union(edit) => apply_union(edit, access, activate),
        PatchKind::Integer(edit) => apply_integer(edit, access, activate),
    }
}

/// Every edit is verified before the first byte is written, so a patch is
/// never left half applied because one of its sites holds foreign bytes.
fn apply_memory(edits: &[MemoryEdit], access: &dyn ImageAccess, activate: bool) -> Result<(), PatchFault> {
    let mut pending: Vec<(Location, &[u8])> = Vec::with_capacity(edits.len());
    for edit in edits {
        let (source, target) = if activate {
            (&edit.disabled, &edit.enabled)
        } else {
            (&edit.enabled, &edit.disabled)
        };

        let location = edit.site.resolve(access, &edit.module, edit.file_offset, edit.len())?;
        let live = access.read(&location)?;
        if live.starts_with(source) {
            pending.push((location, target.as_slice()));
        } else if !live.starts_with(target) {
            return Err(PatchFault::SourceMismatch);
        }
    }

    for (location, target) in pending {
        access.write(&location, target)?;
        debug!("Wrote {} byte(s) to {}+{:#x}", target.len(), location.module, location.offset);
    }
    Ok(())
}

fn restore_pristine(
    access: &dyn ImageAccess,
    location: &Location,
    module: &str,
    file_offset: u64,
) -> Result<(), PatchFault> {
    let original = access.pristine(module, file_offset, location.len)?;
    access.write(location, &original)
}

fn apply_union(edit: &UnionEdit, access: &dyn ImageAccess, activate: bool) -> Result<(), PatchFault> {
    let location = edit.site.resolve(access, &edit.module, edit.file_offset, edit.len)?;
    if !activate {
        return restore_pristine(access, &location, &edit.module, edit.file_offset);
    }

    let variant = edit
        .selected_variant()
        .ok_or_else(|| PatchFault::UnknownVariant(edit.selected.clone().unwrap_or_default()))?;
    access.write(&location, &variant.bytes)
}

fn apply_integer(edit: &IntegerEdit, access: &dyn ImageAccess, activate: bool) -> Result<(), PatchFault> {
    if activate && !edit.in_range(edit.value) {
        return Err(PatchFault::ValueOutOfRange {
            value: edit.value,
            min: edit.min,
            max: edit.max,
        });
    }

    let location = edit.site.resolve(access, &edit.module, edit.file_offset, edit.size)?;
    if activate {
        access.write(&location, &encode_le(edit.value, edit.size))
    } else {
        restore_pristine(access, &location, &edit.module, edit.file_offset)
    }
}
