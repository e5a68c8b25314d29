//! Descriptor file parsing.
//!
//! A descriptor file is a JSON array of patch objects. Records that cannot
//! be parsed are skipped with a warning so one bad entry never hides the
//! rest of the file. A first element without a `name` is file metadata
//! (author, version, ...) and is returned separately.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::descriptor::{PatchHeader, PatchType, UnionVariant};
use super::integer::is_supported_size;
use super::record::{DescriptorRecord, EditSpec, IntegerSpec, MemoryEditSpec, SignatureSpec, UnionSpec};
use crate::error::{Error, Result};

type Object = Map<String, Value>;

/// Result of parsing one descriptor file
#[derive(Debug, Clone, Default)]
pub struct ParsedCatalog {
    pub metadata: Option<Value>,
    pub records: Vec<DescriptorRecord>,
    /// Number of elements skipped as malformed
    pub skipped: usize,
}

pub fn parse_catalog(text: &str) -> Result<ParsedCatalog> {
    let document: Value = serde_json::from_str(text)?;
    let Value::Array(elements) = document else {
        return Err(Error::InvalidDescriptor(
            "descriptor file must be a JSON array".to_string(),
        ));
    };

    let mut catalog = ParsedCatalog::default();
    for (index, element) in elements.iter().enumerate() {
        let has_name = element.get("name").is_some_and(Value::is_string);
        if !has_name {
            if index == 0 {
                let pretty = serde_json::to_string_pretty(element).unwrap_or_default();
                info!("patches file info: \n{}", pretty);
                catalog.metadata = Some(element.clone());
            } else {
                warn!("Failed to parse patch name of element {}", index);
                catalog.skipped += 1;
            }
            continue;
        }

        match parse_record(element) {
            Ok(record) => catalog.records.push(record),
            Err(reason) => {
                warn!("Skipping patch: {}", reason);
                catalog.skipped += 1;
            }
        }
    }

    debug!(
        "Parsed {} patch record(s), skipped {}",
        catalog.records.len(),
        catalog.skipped
    );
    Ok(catalog)
}

fn parse_record(element: &Value) -> std::result::Result<DescriptorRecord, String> {
    let object = element
        .as_object()
        .ok_or_else(|| "patch is not an object".to_string())?;
    let name = str_field(object, "name").unwrap_or_default().to_string();
    let header = parse_header(object, &name)?;

    let type_name = str_field(object, "type").ok_or_else(|| format!("missing type for {}", name))?;
    let patch_type: PatchType = type_name
        .parse()
        .map_err(|_| format!("unknown type '{}' for {}", type_name, name))?;

    let edit = match patch_type {
        PatchType::Memory => parse_memory(object, &name)?,
        PatchType::Signature => parse_signature(object, &name)?,
        PatchType::Union => parse_union(object, &name)?,
        PatchType::Integer => parse_integer(object, &name)?,
    };

    Ok(DescriptorRecord { header, edit })
}

fn parse_header(object: &Object, name: &str) -> std::result::Result<PatchHeader, String> {
    let game_code = str_field(object, "gameCode").ok_or_else(|| format!("missing game code for {}", name))?;
    let description =
        str_field(object, "description").ok_or_else(|| format!("missing description for {}", name))?;

    let (date_code_min, date_code_max) = match int_field(object, "dateCode") {
        Some(date) => (date, date),
        None => match (int_field(object, "dateCodeMin"), int_field(object, "dateCodeMax")) {
            (Some(min), Some(max)) => (min, max),
            _ => (0, 0),
        },
    };

    Ok(PatchHeader {
        name: name.to_string(),
        description: description.to_string(),
        caution: str_field(object, "caution").map(str::to_string),
        game_code: game_code.to_string(),
        date_code_min,
        date_code_max,
        pe_identifier: str_field(object, "peIdentifier")
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        preset: object.get("preset").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn parse_memory(object: &Object, name: &str) -> std::result::Result<EditSpec, String> {
    let patches = object
        .get("patches")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("missing patches for {}", name))?;

    let mut edits = Vec::with_capacity(patches.len());
    for patch in patches {
        let Some(patch) = patch.as_object() else {
            warn!("Memory patch entry of {} is not an object", name);
            continue;
        };
        let disabled = hex_field(patch, "dataDisabled");
        let enabled = hex_field(patch, "dataEnabled");
        let module = str_field(patch, "dllName");
        let offset = offset_field(patch);

        match (disabled, enabled, module, offset) {
            (Some(disabled), Some(enabled), Some(module), Some(file_offset)) => {
                edits.push(MemoryEditSpec {
                    module: module.to_string(),
                    file_offset,
                    disabled,
                    enabled,
                });
            }
            _ => warn!("Unable to get data for memory patch of {}", name),
        }
    }

    Ok(EditSpec::Memory(edits))
}

fn parse_signature(object: &Object, name: &str) -> std::result::Result<EditSpec, String> {
    let pattern = str_field(object, "signature").ok_or_else(|| format!("missing signature for {}", name))?;
    let replacement =
        str_field(object, "replacement").ok_or_else(|| format!("missing replacement for {}", name))?;
    let module = str_field(object, "dllName").ok_or_else(|| format!("missing dllName for {}", name))?;

    let adjustment = match object.get("offset") {
        Some(value) => signed_value(value).ok_or_else(|| format!("invalid offset for {}", name))?,
        None => 0,
    };
    let occurrence = match object.get("usage") {
        Some(value) => signed_value(value).ok_or_else(|| format!("invalid usage for {}", name))?,
        None => 0,
    };

    Ok(EditSpec::Signature(SignatureSpec {
        module: module.to_string(),
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
        occurrence,
        adjustment,
    }))
}

fn parse_union(object: &Object, name: &str) -> std::result::Result<EditSpec, String> {
    let patches = object
        .get("patches")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("missing patches for {}", name))?;

    let mut site: Option<(String, u64, usize)> = None;
    let mut variants = Vec::with_capacity(patches.len());
    for entry in patches {
        let variant_name = entry.get("name").and_then(Value::as_str);
        let patch = entry.get("patch").and_then(Value::as_object);
        let (Some(variant_name), Some(patch)) = (variant_name, patch) else {
            warn!("Unable to get union entry of {}", name);
            continue;
        };

        let module = str_field(patch, "dllName");
        let bytes = hex_field(patch, "data");
        let offset = offset_field(patch);
        let (Some(module), Some(bytes), Some(file_offset)) = (module, bytes, offset) else {
            warn!("Unable to get data for union entry '{}' of {}", variant_name, name);
            continue;
        };

        match &site {
            None => site = Some((module.to_string(), file_offset, bytes.len())),
            Some((first_module, first_offset, first_len)) => {
                if !first_module.eq_ignore_ascii_case(module)
                    || *first_offset != file_offset
                    || *first_len != bytes.len()
                {
                    warn!(
                        "Union entry '{}' of {} does not share module, offset and length with the first entry",
                        variant_name, name
                    );
                    continue;
                }
            }
        }

        variants.push(UnionVariant {
            name: variant_name.to_string(),
            bytes,
        });
    }

    let (module, file_offset, len) = site.ok_or_else(|| format!("no usable union entries for {}", name))?;
    Ok(EditSpec::Union(UnionSpec {
        module,
        file_offset,
        len,
        variants,
    }))
}

fn parse_integer(object: &Object, name: &str) -> std::result::Result<EditSpec, String> {
    let patch = object
        .get("patch")
        .and_then(Value::as_object)
        .ok_or_else(|| format!("missing patch for {}", name))?;

    let module = str_field(patch, "dllName").ok_or_else(|| format!("missing dllName for {}", name))?;
    let file_offset = offset_field(patch).ok_or_else(|| format!("invalid offset for {}", name))?;
    let min = patch
        .get("min")
        .and_then(Value::as_i64)
        .ok_or_else(|| format!("missing min for {}", name))?;
    let max = patch
        .get("max")
        .and_then(Value::as_i64)
        .ok_or_else(|| format!("missing max for {}", name))?;
    let size = patch
        .get("size")
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("missing size for {}", name))? as usize;

    if min >= max {
        return Err(format!("min {} must be below max {} for {}", min, max, name));
    }
    if !is_supported_size(size) {
        return Err(format!("unsupported size {} for {}", size, name));
    }

    Ok(EditSpec::Integer(IntegerSpec {
        module: module.to_string(),
        file_offset,
        size,
        min,
        max,
    }))
}

fn str_field<'a>(object: &'a Object, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn int_field(object: &Object, key: &str) -> Option<i32> {
    object
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
}

/// Hex byte string; odd lengths, bad digits and empty strings are rejected
fn hex_field(object: &Object, key: &str) -> Option<Vec<u8>> {
    let text = str_field(object, key)?;
    hex::decode(text).ok().filter(|bytes| !bytes.is_empty())
}

/// `offset`, falling back to `dataOffset`; zero counts as missing
fn offset_field(object: &Object) -> Option<u64> {
    object
        .get("offset")
        .or_else(|| object.get("dataOffset"))
        .and_then(unsigned_value)
        .filter(|&offset| offset != 0)
}

fn unsigned_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(digits) => u64::from_str_radix(digits, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn signed_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            let (negative, magnitude) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s),
            };
            let parsed = match magnitude.strip_prefix("0x").or_else(|| magnitude.strip_prefix("0X")) {
                Some(digits) => i64::from_str_radix(digits, 16).ok(),
                None => magnitude.parse::<i64>().ok(),
            }?;
            Some(if negative { -parsed } else { parsed })
        }
        _ => None,
    }
}
