//! Descriptor source discovery.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::catalog::{CatalogBuilder, SourceKind};
use crate::patch::parse_catalog;

/// A patch target module and its image identifier, when it has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetModule {
    pub name: String,
    pub identifier: Option<String>,
}

/// Path of the per-build descriptor file of an image identifier
pub fn image_file_path(patches_dir: &Path, identifier: &str) -> PathBuf {
    patches_dir.join(format!("{}.json", identifier))
}

/// Parse a descriptor file into the builder; unreadable or invalid files
/// count as zero records
pub fn append_file(builder: &mut CatalogBuilder<'_>, path: &Path, kind: &SourceKind) -> usize {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            return 0;
        }
    };
    append_text(builder, &text, kind, &path.display().to_string())
}

pub fn append_text(builder: &mut CatalogBuilder<'_>, text: &str, kind: &SourceKind, source: &str) -> usize {
    match parse_catalog(text) {
        Ok(parsed) => builder.append(parsed.records, kind, source),
        Err(e) => {
            warn!("Failed to parse patches from {}: {}", source, e);
            0
        }
    }
}

/// Fill the builder from the first source family that applies.
///
/// Per-build files of the target modules win; otherwise the first shared
/// catalog yielding at least one patch; otherwise the bundled text.
pub fn load_sources(
    builder: &mut CatalogBuilder<'_>,
    targets: &[TargetModule],
    patches_dir: &Path,
    shared_catalogs: &[PathBuf],
    bundled: Option<&str>,
) {
    let image_files: Vec<(PathBuf, String)> = targets
        .iter()
        .filter_map(|target| target.identifier.as_ref())
        .map(|identifier| (image_file_path(patches_dir, identifier), identifier.clone()))
        .filter(|(path, _)| path.exists())
        .collect();

    if !image_files.is_empty() {
        for (path, identifier) in image_files {
            append_file(builder, &path, &SourceKind::ImageFile { identifier });
        }
        return;
    }

    for path in shared_catalogs {
        if path.exists() && append_file(builder, path, &SourceKind::SharedCatalog) > 0 {
            return;
        }
    }

    if let Some(text) = bundled {
        append_text(builder, text, &SourceKind::Bundled, "bundled patches");
    }
}
