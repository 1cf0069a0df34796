//! Per-token digest fed into the rolling hash.
//!
//! The rolling hash works over an alphabet of 256 symbols (its base), so
//! each token is reduced to one byte. Single-character tokens map to their
//! character code; longer tokens use 32-bit FNV-1 folded down to 8 bits.
//! Collisions are expected: identity is always confirmed by comparing token
//! values.

/// FNV-1 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
/// FNV-1 32-bit prime.
pub const FNV_PRIME: u32 = 16_777_619;

/// Hash a token value to the range `[0, 256)`.
///
/// A single character with a code point above 255 keeps only its low byte.
///
/// # Example
///
/// ```
/// use codedupe::detect::token_hash;
///
/// assert_eq!(token_hash("{"), b'{');
/// assert_eq!(token_hash("return"), token_hash("return"));
/// ```
#[must_use]
pub fn token_hash(value: &str) -> u8 {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => (c as u32 & 0xFF) as u8,
        _ => fnv8(value.as_bytes()),
    }
}

/// 32-bit FNV-1 of `bytes`, XOR-folded to 8 bits.
#[must_use]
pub fn fnv8(bytes: &[u8]) -> u8 {
    let mut h = FNV_OFFSET_BASIS;
    for &b in bytes {
        h ^= u32::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    let h = (h >> 16) ^ (h & 0xFFFF);
    ((h >> 8) ^ (h & 0xFF)) as u8
}
