//! Little-endian integer fields of 1, 2, 4 or 8 bytes.

pub const SUPPORTED_SIZES: [usize; 4] = [1, 2, 4, 8];

pub fn is_supported_size(size: usize) -> bool {
    SUPPORTED_SIZES.contains(&size)
}

/// Decode a signed little-endian value, sign-extended to 64 bits
pub fn decode_le(bytes: &[u8]) -> i64 {
    let size = bytes.len().min(8);
    if size == 0 {
        return 0;
    }
    let mut raw = [0u8; 8];
    raw[..size].copy_from_slice(&bytes[..size]);
    let shift = 64 - 8 * size as u32;
    (i64::from_le_bytes(raw) << shift) >> shift
}

/// Encode the low `size` bytes of `value` in little-endian order
pub fn encode_le(value: i64, size: usize) -> Vec<u8> {
    value.to_le_bytes()[..size.min(8)].to_vec()
}
