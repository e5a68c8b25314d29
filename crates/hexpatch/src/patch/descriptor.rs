use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::debug;

use crate::error::PatchFault;
use crate::memory::{ImageAccess, Location};

/// Observed state of a patch, recomputed on every evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PatchStatus {
    Enabled,
    #[default]
    Disabled,
    Error,
}

/// Descriptor `type` field
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PatchType {
    Memory,
    Signature,
    Union,
    #[strum(serialize = "number")]
    #[serde(rename = "number")]
    Integer,
}

/// Identity and compatibility fields shared by every patch kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchHeader {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub caution: Option<String>,
    pub game_code: String,
    #[serde(default)]
    pub date_code_min: i32,
    #[serde(default)]
    pub date_code_max: i32,
    /// Exact image identifier; overrides the date range when present
    #[serde(default)]
    pub pe_identifier: Option<String>,
    #[serde(default)]
    pub preset: bool,
}

impl PatchHeader {
    pub fn has_date_range(&self) -> bool {
        self.date_code_min != 0 || self.date_code_max != 0
    }

    pub fn date_matches(&self, date_code: i32) -> bool {
        self.has_date_range() && self.date_code_min <= date_code && date_code <= self.date_code_max
    }
}

/// Memoized resolution of one patch site.
///
/// The location is resolved once. Fatal faults are remembered so the
/// resolution path is not retried on every poll; transient faults are not.
#[derive(Debug, Clone, Default)]
pub struct SiteCache {
    location: OnceLock<Location>,
    fault: OnceLock<PatchFault>,
}

impl SiteCache {
    /// A site that failed permanently before it was ever resolved
    pub fn failed(fault: PatchFault) -> Self {
        let cache = Self::default();
        let _ = cache.fault.set(fault);
        cache
    }

    pub fn fault(&self) -> Option<&PatchFault> {
        self.fault.get()
    }

    pub fn resolve(
        &self,
        access: &dyn ImageAccess,
        module: &str,
        file_offset: u64,
        len: usize,
    ) -> Result<Location, PatchFault> {
        if let Some(fault) = self.fault.get() {
            return Err(fault.clone());
        }
        if let Some(location) = self.location.get() {
            return Ok(location.clone());
        }

        match access.locate(module, file_offset, len) {
            Ok(location) => Ok(self.location.get_or_init(|| location).clone()),
            Err(fault) => {
                if fault.is_fatal() {
                    debug!("Caching fatal fault for {}+{:#x}: {}", module, file_offset, fault);
                    let _ = self.fault.set(fault.clone());
                }
                Err(fault)
            }
        }
    }
}

/// A fixed byte swap at a file offset
#[derive(Debug, Clone)]
pub struct MemoryEdit {
    pub module: String,
    pub file_offset: u64,
    pub disabled: Vec<u8>,
    pub enabled: Vec<u8>,
    pub site: SiteCache,
}

impl MemoryEdit {
    pub fn new(module: impl Into<String>, file_offset: u64, disabled: Vec<u8>, enabled: Vec<u8>) -> Self {
        Self {
            module: module.into(),
            file_offset,
            disabled,
            enabled,
            site: SiteCache::default(),
        }
    }

    /// An edit whose signature could not be resolved
    pub fn unresolved(module: impl Into<String>, fault: PatchFault) -> Self {
        Self {
            module: module.into(),
            file_offset: 0,
            disabled: Vec::new(),
            enabled: Vec::new(),
            site: SiteCache::failed(fault),
        }
    }

    /// Bytes read when evaluating this edit
    pub fn len(&self) -> usize {
        self.disabled.len().max(self.enabled.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionVariant {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Mutually exclusive byte payloads for one range
#[derive(Debug, Clone)]
pub struct UnionEdit {
    pub module: String,
    pub file_offset: u64,
    pub len: usize,
    pub variants: Vec<UnionVariant>,
    /// Variant intended by the user, or observed in memory
    pub selected: Option<String>,
    pub site: SiteCache,
}

impl UnionEdit {
    pub fn variant(&self, name: &str) -> Option<&UnionVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn selected_variant(&self) -> Option<&UnionVariant> {
        self.selected.as_deref().and_then(|name| self.variant(name))
    }
}

/// A bounded little-endian integer field
#[derive(Debug, Clone)]
pub struct IntegerEdit {
    pub module: String,
    pub file_offset: u64,
    pub size: usize,
    pub min: i64,
    pub max: i64,
    pub value: i64,
    pub site: SiteCache,
}

impl IntegerEdit {
    pub fn in_range(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone)]
pub enum PatchKind {
    /// One or more byte swaps toggled together
    Memory(Vec<MemoryEdit>),
    Union(UnionEdit),
    Integer(IntegerEdit),
}

/// A user-facing patch with its runtime state
#[derive(Debug, Clone)]
pub struct PatchDescriptor {
    pub header: PatchHeader,
    pub kind: PatchKind,
    /// Type as declared in the source; signature patches keep `Signature`
    pub declared_type: PatchType,
    pub hash: String,
    pub enabled: bool,
    pub status: PatchStatus,
    /// Whether `status` comes from an evaluation rather than the default
    pub observed: bool,
    pub error: Option<PatchFault>,
}

impl PatchDescriptor {
    pub fn new(header: PatchHeader, kind: PatchKind, declared_type: PatchType, hash: String) -> Self {
        Self {
            header,
            kind,
            declared_type,
            hash,
            enabled: false,
            status: PatchStatus::Disabled,
            observed: false,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Human-readable reason for the `Error` status
    pub fn error_reason(&self) -> Option<String> {
        self.error.as_ref().map(|fault| fault.to_string())
    }

    /// Modules touched by this patch
    pub fn modules(&self) -> Vec<&str> {
        let mut modules: Vec<&str> = match &self.kind {
            PatchKind::Memory(edits) => edits.iter().map(|e| e.module.as_str()).collect(),
            PatchKind::Union(edit) => vec![edit.module.as_str()],
            PatchKind::Integer(edit) => vec![edit.module.as_str()],
        };
        modules.sort_unstable();
        modules.dedup();
        modules
    }
}
