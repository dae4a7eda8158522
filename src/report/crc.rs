//! # CRC-32 Implementation
//!
//! CRC-32 checksum used by DualSense Bluetooth reports.
//!
//! **Polynomial**: 0xEDB88320 (reflected IEEE 802.3)
//! **Initial Value**: 0xFFFFFFFF, final XOR 0xFFFFFFFF
//!
//! Bluetooth reports are checksummed over a one-byte seed (0xA1 for input,
//! 0xA2 for output) followed by the report bytes.

use crc32fast::Hasher;

/// Calculate CRC-32 of `data`
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Calculate CRC-32 of `seed` followed by `data`
///
/// # Examples
///
/// ```
/// use ds5w::report::crc::{crc32, crc32_seeded};
///
/// let report = [0x31, 0x10, 0x10];
/// assert_eq!(crc32_seeded(0xA2, &report), crc32(&[0xA2, 0x31, 0x10, 0x10]));
/// ```
pub fn crc32_seeded(seed: u8, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[seed]);
    hasher.update(data);
    hasher.finalize()
}
