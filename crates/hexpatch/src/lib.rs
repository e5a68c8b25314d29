//! # hexpatch
//!
//! Binary patch engine for loaded and on-disk module images.
//!
//! This crate provides:
//! - Patch descriptors loaded from JSON catalogs (memory, signature, union and number patches)
//! - Signature scanning with wildcard masks
//! - Status evaluation against live process memory or cached file copies
//! - Live application under scoped page protection, and hard apply into module files
//! - Identity hashes and persisted per-patch state
//!
//! ## Feature Flags
//!
//! - `remote`: Enables importing per-build descriptor files over HTTP.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod module;
pub mod patch;
pub mod prelude;
#[cfg(feature = "remote")]
pub mod remote;
pub mod signature;
pub mod state;

pub use catalog::{Catalog, CatalogBuilder, CatalogSnapshot, SourceKind};
pub use config::{BuildTarget, EngineConfig, EngineConfigBuilder, default_companions};
pub use engine::{PatchEngine, PatchView, TargetModule};
pub use error::{Error, PatchFault, Result};
pub use memory::{AccessMode, FileImage, ImageAccess, LiveImage, Location};
pub use module::{ImageStamp, ModuleHost, ModuleInfo, ModuleLocator, SectionMap, SystemHost, image_identifier};
pub use patch::{
    DescriptorRecord, HardApplyReport, PatchDescriptor, PatchHeader, PatchKind, PatchStatus, PatchType,
    identity_hash, parse_catalog,
};
#[cfg(feature = "remote")]
pub use remote::{ImportOutcome, RemoteImport};
pub use signature::Signature;
pub use state::PatchState;
