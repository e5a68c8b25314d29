//! The patch catalog.
//!
//! A catalog is an immutable snapshot of descriptors. Reloading builds a new
//! snapshot and swaps it in as a whole, so readers never observe a
//! half-built list. Each descriptor sits behind its own mutex, which lets
//! the polling thread evaluate one patch while another is being toggled.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::config::BuildTarget;
use crate::error::PatchFault;
use crate::memory::{Haystack, ImageAccess};
use crate::module::ModuleLocator;
use crate::patch::{
    DescriptorRecord, EditSpec, IntegerEdit, MemoryEdit, PatchDescriptor, PatchHeader, PatchKind, SiteCache,
    UnionEdit, apply, identity_hash,
};
use crate::signature;
use crate::state::PatchState;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where a batch of records came from; decides which records apply to the
/// running build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Per-build file named after a module's image identifier
    ImageFile { identifier: String },
    /// Shared catalog covering many builds
    SharedCatalog,
    /// Descriptors shipped with the host application
    Bundled,
}

/// Immutable list of descriptors
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    entries: Vec<Mutex<PatchDescriptor>>,
    index: HashMap<String, usize>,
    sources: Vec<String>,
}

impl CatalogSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Mutex<PatchDescriptor>] {
        &self.entries
    }

    /// Names of the sources the snapshot was built from
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn get(&self, hash: &str) -> Option<&Mutex<PatchDescriptor>> {
        self.index.get(hash).map(|&i| &self.entries[i])
    }

    /// Look up by hash, falling back to a case-insensitive name match
    pub fn find(&self, query: &str) -> Option<&Mutex<PatchDescriptor>> {
        self.get(query).or_else(|| {
            self.entries
                .iter()
                .find(|entry| lock(entry).name().eq_ignore_ascii_case(query))
        })
    }

    /// Cloned copies of every descriptor
    pub fn descriptors(&self) -> Vec<PatchDescriptor> {
        self.entries.iter().map(|entry| lock(entry).clone()).collect()
    }

    /// Activate every enabled descriptor; returns how many were applied
    pub fn auto_apply(&self, access: &dyn ImageAccess) -> usize {
        let mut applied = 0;
        for entry in &self.entries {
            let descriptor = lock(entry);
            if !descriptor.enabled {
                continue;
            }
            if apply(&descriptor, access, true) {
                applied += 1;
                log_auto_apply(&descriptor);
            }
        }
        applied
    }
}

fn log_auto_apply(descriptor: &PatchDescriptor) {
    match &descriptor.kind {
        PatchKind::Memory(_) => info!("auto apply: {} = ON", descriptor.name()),
        PatchKind::Union(edit) => info!(
            "auto apply: {} = {}",
            descriptor.name(),
            edit.selected.as_deref().unwrap_or_default()
        ),
        PatchKind::Integer(edit) => info!("auto apply: {} = {}", descriptor.name(), edit.value),
    }
}

/// Owner of the current snapshot
#[derive(Debug, Default)]
pub struct Catalog {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::clone(&snapshot);
        snapshot
    }
}

/// Turns descriptor records into a snapshot
pub struct CatalogBuilder<'a> {
    access: &'a dyn ImageAccess,
    locator: &'a ModuleLocator,
    state: &'a PatchState,
    target: &'a BuildTarget,
    image_identifiers: &'a [String],
    descriptors: Vec<PatchDescriptor>,
    hashes: HashSet<String>,
    haystacks: HashMap<String, Result<Haystack, PatchFault>>,
    sources: Vec<String>,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(
        access: &'a dyn ImageAccess,
        locator: &'a ModuleLocator,
        state: &'a PatchState,
        target: &'a BuildTarget,
        image_identifiers: &'a [String],
    ) -> Self {
        Self {
            access,
            locator,
            state,
            target,
            image_identifiers,
            descriptors: Vec::new(),
            hashes: HashSet::new(),
            haystacks: HashMap::new(),
            sources: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Whether a record applies to the running build
    pub fn accepts(&self, header: &PatchHeader, kind: &SourceKind) -> bool {
        if header.game_code != self.target.model {
            return false;
        }
        match kind {
            SourceKind::ImageFile { .. } => true,
            SourceKind::SharedCatalog => match &header.pe_identifier {
                Some(identifier) => self.image_identifiers.iter().any(|id| id == identifier),
                None => header.date_matches(self.target.date_code),
            },
            SourceKind::Bundled => header.date_matches(self.target.date_code),
        }
    }

    /// Add records from one source; returns how many descriptors were added
    pub fn append(&mut self, records: Vec<DescriptorRecord>, kind: &SourceKind, source: &str) -> usize {
        let before = self.descriptors.len();
        for record in records {
            let DescriptorRecord { mut header, edit } = record;
            if let SourceKind::ImageFile { identifier } = kind {
                header.pe_identifier.get_or_insert_with(|| identifier.clone());
            }

            if !self.accepts(&header, kind) {
                continue;
            }

            let hash = identity_hash(&header);
            if !self.hashes.insert(hash.clone()) {
                debug!("Skipping duplicate patch {}", header.name);
                continue;
            }

            let declared_type = edit.patch_type();
            let patch_kind = self.build_kind(edit);
            let mut descriptor = PatchDescriptor::new(header, patch_kind, declared_type, hash);
            self.state.restore(&mut descriptor);
            self.descriptors.push(descriptor);
        }

        let added = self.descriptors.len() - before;
        if added > 0 {
            self.sources.push(source.to_string());
        }
        info!("Loaded {} patch(es) from {}", added, source);
        added
    }

    fn haystack(&mut self, module: &str) -> Result<&Haystack, PatchFault> {
        let access = self.access;
        self.haystacks
            .entry(module.to_ascii_lowercase())
            .or_insert_with(|| access.haystack(module))
            .as_ref()
            .map_err(Clone::clone)
    }

    fn build_kind(&mut self, edit: EditSpec) -> PatchKind {
        match edit {
            EditSpec::Memory(entries) => PatchKind::Memory(
                entries
                    .into_iter()
                    .map(|fields| {
                        let module = self.locator.canonical_name(&fields.module);
                        MemoryEdit::new(module, fields.file_offset, fields.disabled, fields.enabled)
                    })
                    .collect(),
            ),
            EditSpec::Signature(fields) => {
                let module = self.locator.canonical_name(&fields.module);
                let resolved = self.haystack(&module).and_then(|haystack| {
                    signature::resolve(
                        &module,
                        haystack,
                        &fields.pattern,
                        &fields.replacement,
                        fields.occurrence,
                        fields.adjustment,
                    )
                });
                let edit = match resolved {
                    Ok(resolved) => MemoryEdit::new(module, resolved.file_offset, resolved.disabled, resolved.enabled),
                    Err(fault) => {
                        warn!("Signature for {} could not be resolved: {}", fields.pattern, fault);
                        MemoryEdit::unresolved(module, fault)
                    }
                };
                PatchKind::Memory(vec![edit])
            }
            EditSpec::Union(fields) => PatchKind::Union(UnionEdit {
                module: self.locator.canonical_name(&fields.module),
                file_offset: fields.file_offset,
                len: fields.len,
                variants: fields.variants,
                selected: None,
                site: SiteCache::default(),
            }),
            EditSpec::Integer(fields) => PatchKind::Integer(IntegerEdit {
                module: self.locator.canonical_name(&fields.module),
                file_offset: fields.file_offset,
                size: fields.size,
                min: fields.min,
                max: fields.max,
                value: fields.min,
                site: SiteCache::default(),
            }),
        }
    }

    pub fn finish(self) -> CatalogSnapshot {
        let index = self
            .descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.hash.clone(), i))
            .collect();
        CatalogSnapshot {
            entries: self.descriptors.into_iter().map(Mutex::new).collect(),
            index,
            sources: self.sources,
        }
    }
}
