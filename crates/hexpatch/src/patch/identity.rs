//! Stable patch identity.
//!
//! Persisted state is keyed by this hash, so the byte layout must never
//! change: game code, then the date range as two little-endian i32 values
//! (only when either bound is set), then the image identifier (when set),
//! then name and description.

use sha2::{Digest, Sha256};

use super::descriptor::PatchHeader;

/// Lower-case hex SHA-256 of the identity fields.
///
/// Fields are concatenated without separators, so ("AB", "Cx") and
/// ("ABC", "x") collide. Existing state files depend on this layout; adding
/// separators would orphan every saved entry.
pub fn identity_hash(header: &PatchHeader) -> String {
    let mut hasher = Sha256::new();
    hasher.update(header.game_code.as_bytes());
    if header.has_date_range() {
        hasher.update(header.date_code_min.to_le_bytes());
        hasher.update(header.date_code_max.to_le_bytes());
    }
    if let Some(identifier) = header.pe_identifier.as_deref().filter(|id| !id.is_empty()) {
        hasher.update(identifier.as_bytes());
    }
    hasher.update(header.name.as_bytes());
    hasher.update(header.description.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> PatchHeader {
        PatchHeader {
            name: "Skip intro".into(),
            description: "Skips the attract sequence".into(),
            game_code: "ABC".into(),
            date_code_min: 100,
            date_code_max: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_is_stable() {
        let hash = identity_hash(&header());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, identity_hash(&header()));
    }

    #[test]
    fn test_hash_covers_description() {
        let mut changed = header();
        changed.description.push('.');
        assert_ne!(identity_hash(&header()), identity_hash(&changed));
    }

    #[test]
    fn test_hash_byte_layout() {
        let mut hasher = Sha256::new();
        hasher.update(b"ABC");
        hasher.update(100i32.to_le_bytes());
        hasher.update(200i32.to_le_bytes());
        hasher.update(b"Skip intro");
        hasher.update(b"Skips the attract sequence");
        assert_eq!(identity_hash(&header()), hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_optional_fields() {
        let mut no_dates = header();
        no_dates.date_code_min = 0;
        no_dates.date_code_max = 0;
        let mut expected = Sha256::new();
        expected.update(b"ABCSkip introSkips the attract sequence");
        assert_eq!(identity_hash(&no_dates), hex::encode(expected.finalize()));

        let mut empty_id = no_dates.clone();
        empty_id.pe_identifier = Some(String::new());
        assert_eq!(identity_hash(&empty_id), identity_hash(&no_dates));

        let mut with_id = no_dates.clone();
        with_id.pe_identifier = Some("ABC-5f1e0c2a_8b4c10".into());
        assert_ne!(identity_hash(&with_id), identity_hash(&no_dates));
    }

    #[test]
    fn test_fields_are_not_separated() {
        let mut left = header();
        left.name = "AB".into();
        left.description = "Cx".into();
        let mut right = header();
        right.name = "ABC".into();
        right.description = "x".into();
        assert_eq!(identity_hash(&left), identity_hash(&right));
    }
}
