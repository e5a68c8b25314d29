//! Wildcard byte signatures.
//!
//! Patterns are hex byte pairs with optional spaces; `??` and `XX` mark a
//! wildcard byte. A signature patch stores a search pattern and a
//! replacement, both in this syntax. Resolving it yields a fixed file offset
//! plus the disabled/enabled byte arrays of an ordinary memory edit.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::PatchFault;
use crate::memory::Haystack;

/// A parsed pattern: `mask[i]` is true when `bytes[i]` is a literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: Vec<u8>,
    mask: Vec<bool>,
    anchor: Option<usize>,
}

fn is_wildcard(c: char) -> bool {
    c == '?' || c == 'X'
}

impl FromStr for Signature {
    type Err = PatchFault;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let digits: Vec<char> = pattern.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() {
            return Err(PatchFault::MalformedPattern("empty pattern".to_string()));
        }
        if digits.len() % 2 != 0 {
            return Err(PatchFault::MalformedPattern(format!(
                "odd number of digits in '{}'",
                pattern
            )));
        }

        let mut bytes = Vec::with_capacity(digits.len() / 2);
        let mut mask = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks(2) {
            let (hi, lo) = (pair[0], pair[1]);
            match (is_wildcard(hi), is_wildcard(lo)) {
                (true, true) => {
                    bytes.push(0);
                    mask.push(false);
                }
                (false, false) => {
                    let token: String = pair.iter().collect();
                    let value = u8::from_str_radix(&token, 16).map_err(|_| {
                        PatchFault::MalformedPattern(format!("invalid byte '{}'", token))
                    })?;
                    bytes.push(value);
                    mask.push(true);
                }
                _ => {
                    return Err(PatchFault::MalformedPattern(format!(
                        "half wildcard '{}{}'",
                        hi, lo
                    )));
                }
            }
        }

        let anchor = mask.iter().position(|&literal| literal);
        Ok(Self {
            bytes,
            mask,
            anchor,
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .bytes
            .iter()
            .zip(&self.mask)
            .map(|(byte, &literal)| {
                if literal {
                    format!("{:02X}", byte)
                } else {
                    "??".to_string()
                }
            })
            .collect();
        f.write_str(&tokens.join(" "))
    }
}

impl Signature {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Literal byte at `index`, `None` for wildcards and positions past the end
    pub fn literal(&self, index: usize) -> Option<u8> {
        match self.mask.get(index) {
            Some(true) => Some(self.bytes[index]),
            _ => None,
        }
    }

    fn matches_at(&self, haystack: &[u8], position: usize) -> bool {
        haystack[position..position + self.len()]
            .iter()
            .zip(self.bytes.iter().zip(&self.mask))
            .all(|(actual, (expected, &literal))| !literal || actual == expected)
    }

    /// First match at or after `start`
    pub fn find_from(&self, haystack: &[u8], start: usize) -> Option<usize> {
        let len = self.len();
        if len == 0 || haystack.len() < len {
            return None;
        }
        let last = haystack.len() - len;

        let Some(anchor) = self.anchor else {
            return (start <= last).then_some(start);
        };

        // Jump between occurrences of the first literal byte
        let needle = self.bytes[anchor];
        let mut position = start;
        while position <= last {
            let window = &haystack[position + anchor..=last + anchor];
            let candidate = position + memchr::memchr(needle, window)?;
            if self.matches_at(haystack, candidate) {
                return Some(candidate);
            }
            position = candidate + 1;
        }
        None
    }

    /// Every match, each search restarting one byte after the previous hit
    pub fn find_all(&self, haystack: &[u8]) -> Vec<usize> {
        let mut matches = Vec::new();
        let mut start = 0;
        while let Some(position) = self.find_from(haystack, start) {
            matches.push(position);
            start = position + 1;
        }
        matches
    }

    /// Select one match by 0-based index; negative indices count back from
    /// the last match (`-1` is the last one).
    pub fn find(&self, haystack: &[u8], occurrence: i64) -> Result<usize, PatchFault> {
        if occurrence >= 0 {
            let mut start = 0;
            let mut found = 0usize;
            while let Some(position) = self.find_from(haystack, start) {
                if found as i64 == occurrence {
                    return Ok(position);
                }
                found += 1;
                start = position + 1;
            }
            return Err(PatchFault::PatternOccurrenceNotFound { occurrence, found });
        }

        let matches = self.find_all(haystack);
        let back = occurrence.unsigned_abs() as usize;
        if back > matches.len() {
            return Err(PatchFault::PatternOccurrenceNotFound {
                occurrence,
                found: matches.len(),
            });
        }
        Ok(matches[matches.len() - back])
    }
}

/// Build the disabled/enabled arrays for the bytes found at a match.
///
/// Literal positions come from the pattern (disabled) or the replacement
/// (enabled). Wildcards, and positions past the end of the shorter of the
/// two, keep the live byte so that toggling never touches them.
pub fn derive_states(pattern: &Signature, replacement: &Signature, live: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let disabled = live
        .iter()
        .enumerate()
        .map(|(i, &byte)| pattern.literal(i).unwrap_or(byte))
        .collect();
    let enabled = live
        .iter()
        .enumerate()
        .map(|(i, &byte)| replacement.literal(i).unwrap_or(byte))
        .collect();
    (disabled, enabled)
}

/// A signature resolved against a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSignature {
    pub file_offset: u64,
    pub disabled: Vec<u8>,
    pub enabled: Vec<u8>,
}

/// Locate a signature in a module copy and derive its memory edit
pub fn resolve(
    module: &str,
    haystack: &Haystack,
    pattern: &str,
    replacement: &str,
    occurrence: i64,
    adjustment: i64,
) -> Result<ResolvedSignature, PatchFault> {
    let pattern: Signature = pattern.parse()?;
    let replacement: Signature = replacement.parse()?;
    let len = pattern.len().max(replacement.len());
    let bytes = haystack.bytes();

    let found = pattern.find(bytes, occurrence)?;
    let position = found as i64 + adjustment;
    if position < 0 || position as usize + len > bytes.len() {
        return Err(PatchFault::OffsetOutOfBounds {
            offset: position.max(0) as u64,
            len,
            limit: bytes.len() as u64,
        });
    }
    let position = position as usize;

    let file_offset = haystack
        .to_file_offset(position as u64)
        .ok_or_else(|| PatchFault::RvaNotFound {
            module: module.to_string(),
            offset: position as u64,
        })?;

    let (disabled, enabled) = derive_states(&pattern, &replacement, &bytes[position..position + len]);
    debug!(
        "Signature {} in {} resolved to file offset {:#x}",
        pattern, module, file_offset
    );

    Ok(ResolvedSignature {
        file_offset,
        disabled,
        enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(text: &str) -> Signature {
        text.parse().unwrap()
    }

    #[test]
    fn test_parse_pattern() {
        let s = sig("90 90 ?? XX eb");
        assert_eq!(s.len(), 5);
        assert_eq!(s.literal(0), Some(0x90));
        assert_eq!(s.literal(2), None);
        assert_eq!(s.literal(3), None);
        assert_eq!(s.literal(4), Some(0xeb));
        assert_eq!(s.literal(5), None);
        assert_eq!(s.to_string(), "90 90 ?? ?? EB");
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "   ", "909", "?A", "9?", "GG", "90 0Z"] {
            assert!(
                matches!(bad.parse::<Signature>(), Err(PatchFault::MalformedPattern(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_occurrence_selection() {
        let mut haystack = vec![0u8; 24];
        for at in [4, 10, 16] {
            haystack[at..at + 3].copy_from_slice(&[0xde, 0xad, 0xbe]);
        }
        let s = sig("DE ?? BE");

        assert_eq!(s.find_all(&haystack), vec![4, 10, 16]);
        assert_eq!(s.find(&haystack, 0), Ok(4));
        assert_eq!(s.find(&haystack, 1), Ok(10));
        assert_eq!(s.find(&haystack, 2), Ok(16));
        assert_eq!(s.find(&haystack, -1), Ok(16));
        assert_eq!(s.find(&haystack, -3), Ok(4));
        assert_eq!(
            s.find(&haystack, 3),
            Err(PatchFault::PatternOccurrenceNotFound {
                occurrence: 3,
                found: 3
            })
        );
        assert!(s.find(&haystack, -4).is_err());
    }

    #[test]
    fn test_overlapping_matches() {
        let haystack = [0xaa, 0xaa, 0xaa, 0xaa];
        assert_eq!(sig("AA AA").find_all(&haystack), vec![0, 1, 2]);
    }

    #[test]
    fn test_leading_wildcard_anchor() {
        let haystack = [0x01, 0x02, 0x03, 0x02, 0x05];
        assert_eq!(sig("?? 02 ??").find_all(&haystack), vec![0, 2]);
        assert_eq!(sig("?? ??").find(&haystack, 0), Ok(0));
    }

    #[test]
    fn test_wildcard_pass_through() {
        // Live bytes under the pattern's wildcards must survive both states
        let live = [0x90, 0x90, 0x12, 0x34];
        let (disabled, enabled) = derive_states(&sig("9090????"), &sig("EB02????"), &live);
        assert_eq!(disabled, vec![0x90, 0x90, 0x12, 0x34]);
        assert_eq!(enabled, vec![0xeb, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_derive_uneven_lengths() {
        let live = [0x74, 0x05, 0x31, 0xc0];
        let (disabled, enabled) = derive_states(&sig("74 05"), &sig("EB 05 ?? 90"), &live);
        assert_eq!(disabled, vec![0x74, 0x05, 0x31, 0xc0]);
        assert_eq!(enabled, vec![0xeb, 0x05, 0x31, 0x90]);
    }

    #[test]
    fn test_resolve_with_adjustment() {
        let mut bytes = vec![0u8; 32];
        for at in [4, 10, 16] {
            bytes[at..at + 2].copy_from_slice(&[0x75, 0x10]);
        }
        bytes[12] = 0x55;
        let haystack = Haystack::file(bytes);

        let resolved = resolve("game.dll", &haystack, "75 10", "?? ?? 66", 1, 2).unwrap();
        assert_eq!(resolved.file_offset, 12);
        // Pattern literals apply at the adjusted position
        assert_eq!(resolved.disabled, vec![0x75, 0x10, 0x00]);
        assert_eq!(resolved.enabled, vec![0x55, 0x00, 0x66]);

        assert!(matches!(
            resolve("game.dll", &haystack, "75 10", "EB", 0, -10),
            Err(PatchFault::OffsetOutOfBounds { .. })
        ));
        assert!(matches!(
            resolve("game.dll", &haystack, "75 1", "EB", 0, 0),
            Err(PatchFault::MalformedPattern(_))
        ));
    }
}
