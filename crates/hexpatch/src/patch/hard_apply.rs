//! Writing patch state permanently into module files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::descriptor::{PatchDescriptor, PatchKind};
use super::integer::encode_le;
use crate::memory::backup_path;
use crate::module::ModuleLocator;

/// A patch that could not be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPatch {
    pub name: String,
    pub reason: String,
}

/// A module file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardApplyReport {
    pub files_written: Vec<PathBuf>,
    pub backups_created: Vec<PathBuf>,
    pub writes: usize,
    pub skipped: Vec<SkippedPatch>,
    pub failures: Vec<FileFailure>,
}

impl HardApplyReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failures.is_empty()
    }
}

struct PendingWrite {
    patch: String,
    offset: u64,
    bytes: Vec<u8>,
}

/// Collect the bytes each patch wants on disk, grouped by module
fn collect_writes<'a>(
    descriptors: impl IntoIterator<Item = &'a PatchDescriptor>,
    report: &mut HardApplyReport,
) -> BTreeMap<String, (String, Vec<PendingWrite>)> {
    // keyed case-insensitively, keeping the first spelling for the path
    let mut writes: BTreeMap<String, (String, Vec<PendingWrite>)> = BTreeMap::new();
    let mut push = |module: &str, patch: &str, offset: u64, bytes: Vec<u8>| {
        writes
            .entry(module.to_ascii_lowercase())
            .or_insert_with(|| (module.to_string(), Vec::new()))
            .1
            .push(PendingWrite {
                patch: patch.to_string(),
                offset,
                bytes,
            });
    };

    for descriptor in descriptors {
        let name = descriptor.name();
        match &descriptor.kind {
            PatchKind::Memory(edits) => {
                for edit in edits {
                    if let Some(fault) = edit.site.fault() {
                        report.skipped.push(SkippedPatch {
                            name: name.to_string(),
                            reason: fault.to_string(),
                        });
                        continue;
                    }
                    let bytes = if descriptor.enabled { &edit.enabled } else { &edit.disabled };
                    push(&edit.module, name, edit.file_offset, bytes.clone());
                }
            }
            PatchKind::Union(edit) if descriptor.enabled => match edit.selected_variant() {
                Some(variant) => push(&edit.module, name, edit.file_offset, variant.bytes.clone()),
                None => report.skipped.push(SkippedPatch {
                    name: name.to_string(),
                    reason: "no variant selected".to_string(),
                }),
            },
            PatchKind::Integer(edit) if descriptor.enabled => {
                if edit.in_range(edit.value) {
                    push(&edit.module, name, edit.file_offset, encode_le(edit.value, edit.size));
                } else {
                    report.skipped.push(SkippedPatch {
                        name: name.to_string(),
                        reason: format!("value {} out of range", edit.value),
                    });
                }
            }
            _ => {}
        }
    }
    writes
}

fn create_backup(path: &Path, report: &mut HardApplyReport) -> std::io::Result<()> {
    let backup = backup_path(path);
    if backup.exists() {
        return Ok(());
    }
    fs::copy(path, &backup)?;
    info!("Created backup {}", backup.display());
    report.backups_created.push(backup);
    Ok(())
}

fn write_file(path: &Path, writes: &[PendingWrite], report: &mut HardApplyReport) -> std::io::Result<()> {
    create_backup(path, report)?;

    let mut contents = fs::read(path)?;
    let mut written = 0;
    for write in writes {
        let start = write.offset as usize;
        let end = start.saturating_add(write.bytes.len());
        if end > contents.len() {
            warn!(
                "Patch {} does not fit into {} ({:#x} + {})",
                write.patch,
                path.display(),
                write.offset,
                write.bytes.len()
            );
            report.skipped.push(SkippedPatch {
                name: write.patch.clone(),
                reason: format!("offset {:#x} beyond end of file", write.offset),
            });
            continue;
        }
        contents[start..end].copy_from_slice(&write.bytes);
        written += 1;
    }

    fs::write(path, contents)?;
    report.writes += written;
    report.files_written.push(path.to_path_buf());
    Ok(())
}

/// Write every patch into its module file.
///
/// Memory patches write their enabled or disabled bytes; union and integer
/// patches are written only when enabled. Each file is backed up to
/// `<file>.bak` before its first modification. A failing file is reported
/// and does not stop the remaining files.
pub fn hard_apply<'a>(
    descriptors: impl IntoIterator<Item = &'a PatchDescriptor>,
    locator: &ModuleLocator,
) -> HardApplyReport {
    let mut report = HardApplyReport::default();
    let writes = collect_writes(descriptors, &mut report);

    for (module, writes) in writes.values() {
        let path = locator.path(module);
        if let Err(e) = write_file(&path, writes, &mut report) {
            warn!("Hard apply failed for {}: {}", path.display(), e);
            report.failures.push(FileFailure {
                path,
                error: e.to_string(),
            });
        }
    }

    info!(
        "Hard apply: {} write(s) to {} file(s), {} skipped, {} failed",
        report.writes,
        report.files_written.len(),
        report.skipped.len(),
        report.failures.len()
    );
    report
}
