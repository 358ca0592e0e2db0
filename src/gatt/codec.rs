//! Characteristic value encoding.
//!
//! Numeric characteristics carry a little-endian `int16`. Text fields use
//! the same two zero bytes as the "cleared" sentinel. Peer addresses are
//! rendered here too.

/// Value written to auth characteristics when they are cleared.
pub const ZERO_SENTINEL: [u8; 2] = [0x00, 0x00];

/// Encode an `int16` characteristic value.
pub const fn encode_i16(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Decode an `int16` characteristic value.
///
/// Only the first two bytes are significant; shorter payloads are rejected.
pub fn decode_i16(payload: &[u8]) -> Option<i16> {
    match payload {
        [lo, hi, ..] => Some(i16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// Render a BLE address as `aa:bb:cc:dd:ee:ff`.
pub fn format_mac(mac: &[u8; 6]) -> heapless::String<17> {
    use core::fmt::Write;

    let mut out = heapless::String::new();
    for (i, b) in mac.iter().enumerate() {
        let sep = if i == 0 { "" } else { ":" };
        let _ = write!(out, "{sep}{b:02x}");
    }
    out
}
