//! Key layout for LDB tables
//!
//! Every key starts with a 4-byte short key. Byte 0 selects the sector file,
//! bytes 1-3 select one of 256 x 256 x 256 slots in the sector map. Anything
//! after the short key is the subkey, used to pick datasets inside a node.

use crate::error::{LdbError, LdbResult};

/// Length of the short key
pub const KEY_LN: usize = 4;

/// Number of slots addressed by bytes 1-3 of the short key
pub const SLOTS_PER_SECTOR: u32 = 256 * 256 * 256;

/// Slot number of a short key inside its sector map
pub fn slot_index(key: &[u8]) -> LdbResult<u32> {
    let short = short_key(key)?;
    Ok(((short[1] as u32) << 16) | ((short[2] as u32) << 8) | short[3] as u32)
}

/// Build the short key for `slot` in sector `k0`
pub fn short_key_from_slot(k0: u8, slot: u32) -> [u8; KEY_LN] {
    [k0, (slot >> 16) as u8, (slot >> 8) as u8, slot as u8]
}

/// The first four bytes of a key
pub fn short_key(key: &[u8]) -> LdbResult<&[u8]> {
    key.get(..KEY_LN).ok_or_else(|| {
        LdbError::InvalidKey(format!(
            "key is {} bytes, at least {} required",
            key.len(),
            KEY_LN
        ))
    })
}

/// The subkey part of `key`, if the key is long enough to carry one
pub fn subkey(key: &[u8], subkey_ln: usize) -> Option<&[u8]> {
    key.get(KEY_LN..KEY_LN + subkey_ln)
}

/// Parse a key written as hex digits, e.g. `0a1b2c3d`
pub fn parse_hex(text: &str) -> LdbResult<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(LdbError::InvalidKey(format!(
            "odd number of hex digits in {:?}",
            text
        )));
    }

    (0..text.len())
        .step_by(2)
        .map(|i| {
            text.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| LdbError::InvalidKey(format!("invalid hex in {:?}", text)))
        })
        .collect()
}

/// Format bytes as lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
