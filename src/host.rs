//! The host boundary: what the in-memory key-value server must expose.
//!
//! The engine never touches host state directly. It asks the host to
//! serialize a live key into an opaque payload on the eviction edge, and to
//! materialize a key from a payload on the miss edge. A host adapter
//! implements [`Host`] over the server's module API and forwards keyspace
//! events and commands to the engine.

use crate::error::HostError;
use bytes::Bytes;

/// TTL-probe sentinel: the key carries no expiry.
pub const PTTL_NO_EXPIRY: i64 = -1;

/// TTL-probe sentinel: the key was not present when probed.
pub const PTTL_KEY_ABSENT: i64 = -2;

/// Synchronous call surface of the host server.
///
/// All calls run on the host's command-processing thread, from inside a
/// callback; implementations must not block on the engine in return.
pub trait Host: Send + Sync {
    /// Serialize the live key to an opaque payload.
    ///
    /// The payload must be sufficient for [`Host::materialize`] to
    /// reconstruct the key later; the engine never inspects it.
    fn serialize(&self, key: &[u8]) -> Result<Bytes, HostError>;

    /// Remaining TTL of the live key in milliseconds.
    ///
    /// Returns a positive value for a finite TTL, [`PTTL_NO_EXPIRY`] when the
    /// key has no expiry, or [`PTTL_KEY_ABSENT`] when the key is gone.
    fn remaining_ttl_ms(&self, key: &[u8]) -> Result<i64, HostError>;

    /// Materialize the key from a payload, replacing any in-memory copy.
    ///
    /// `ttl_ms` is relative: positive for a finite TTL, 0 for no expiry.
    fn materialize(&self, key: &[u8], payload: &[u8], ttl_ms: i64) -> Result<(), HostError>;
}

/// Sink for the host's info/stats hook.
///
/// The engine fills sections and fields; the adapter renders them with the
/// host's own info primitives. Implementations must not take locks shared
/// with the spill or restore paths.
pub trait InfoSink {
    /// Start a named section.
    fn section(&mut self, name: &str);

    /// Emit an unsigned integer field.
    fn field_u64(&mut self, name: &str, value: u64);

    /// Emit a signed integer field.
    fn field_i64(&mut self, name: &str, value: i64);

    /// Emit a string field.
    fn field_str(&mut self, name: &str, value: &str);
}
