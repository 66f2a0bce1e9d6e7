//! Stored-entry framing.
//!
//! Every value in the store is the concatenation of an 8-byte expiry header
//! and the host's opaque payload:
//!
//! ```text
//! offset  size  field
//! 0       8     expiry_ms  signed 64-bit, little-endian
//! 8       N     payload    opaque bytes from the host serializer
//! ```
//!
//! `expiry_ms > 0` is an absolute wall-clock deadline in milliseconds since
//! the Unix epoch; any non-positive value means "no expiry" (the host's
//! TTL-probe sentinels are stored verbatim and fold into this case on read).
//! There is no length field: the payload length is the value length minus the
//! header. Integrity is the store's job; there is no checksum.

use crate::error::Error;

/// Length of the expiry header in bytes.
pub const HEADER_LEN: usize = 8;

/// Frame an entry value from its absolute expiry and payload.
pub fn encode(expiry_ms: i64, payload: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(HEADER_LEN + payload.len());
    value.extend_from_slice(&expiry_ms.to_le_bytes());
    value.extend_from_slice(payload);
    value
}

/// Split a stored value into its expiry and borrowed payload.
///
/// Values shorter than the header are corrupted.
pub fn decode(value: &[u8]) -> Result<(i64, &[u8]), Error> {
    let expiry_ms = decode_expiry(value).ok_or(Error::Corrupted)?;
    Ok((expiry_ms, &value[HEADER_LEN..]))
}

/// Decode just the expiry header, without touching the payload.
pub fn decode_expiry(value: &[u8]) -> Option<i64> {
    let header: [u8; HEADER_LEN] = value.get(..HEADER_LEN)?.try_into().ok()?;
    Some(i64::from_le_bytes(header))
}

/// Whether an entry with this expiry is logically gone at `now_ms`.
pub fn is_expired(expiry_ms: i64, now_ms: i64) -> bool {
    expiry_ms > 0 && expiry_ms <= now_ms
}

/// Relative TTL to hand the host on restore.
///
/// A finite expiry is floored at 1 ms so a restore racing the deadline still
/// materializes a key that expires rather than one that lives forever;
/// everything else maps to 0, "no expiry".
pub fn restore_ttl_ms(expiry_ms: i64, now_ms: i64) -> i64 {
    if expiry_ms > 0 {
        (expiry_ms - now_ms).max(1)
    } else {
        0
    }
}
