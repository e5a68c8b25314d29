//! Patch descriptors and the operations on them.

pub mod apply;
mod descriptor;
pub mod hard_apply;
mod identity;
pub mod integer;
mod parse;
mod record;
pub mod status;

pub use apply::{apply, try_apply};
pub use descriptor::{
    IntegerEdit, MemoryEdit, PatchDescriptor, PatchHeader, PatchKind, PatchStatus, PatchType, SiteCache,
    UnionEdit, UnionVariant,
};
pub use hard_apply::{FileFailure, HardApplyReport, SkippedPatch, hard_apply};
pub use identity::identity_hash;
pub use parse::{ParsedCatalog, parse_catalog};
pub use record::{DescriptorRecord, EditSpec, IntegerSpec, MemoryEditSpec, SignatureSpec, UnionSpec};
pub use status::evaluate;
