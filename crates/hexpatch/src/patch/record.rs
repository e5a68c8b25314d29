//! Parsed descriptor records.
//!
//! Records are what a descriptor source produces. They carry no runtime
//! state; the catalog builder turns them into [`PatchDescriptor`]s.
//!
//! [`PatchDescriptor`]: super::PatchDescriptor

use serde::{Deserialize, Serialize};

use super::descriptor::{PatchHeader, PatchType, UnionVariant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEditSpec {
    pub module: String,
    pub file_offset: u64,
    pub disabled: Vec<u8>,
    pub enabled: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    pub module: String,
    pub pattern: String,
    pub replacement: String,
    /// 0-based match index, negative counts back from the last match
    #[serde(default)]
    pub occurrence: i64,
    /// Added to the match position
    #[serde(default)]
    pub adjustment: i64,
}

/// Variants already checked to share module, offset and length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionSpec {
    pub module: String,
    pub file_offset: u64,
    pub len: usize,
    pub variants: Vec<UnionVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerSpec {
    pub module: String,
    pub file_offset: u64,
    pub size: usize,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum EditSpec {
    Memory(Vec<MemoryEditSpec>),
    Signature(SignatureSpec),
    Union(UnionSpec),
    #[serde(rename = "number")]
    Integer(IntegerSpec),
}

impl EditSpec {
    pub fn patch_type(&self) -> PatchType {
        match self {
            EditSpec::Memory(_) => PatchType::Memory,
            EditSpec::Signature(_) => PatchType::Signature,
            EditSpec::Union(_) => PatchType::Union,
            EditSpec::Integer(_) => PatchType::Integer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorRecord {
    pub header: PatchHeader,
    pub edit: EditSpec,
}
