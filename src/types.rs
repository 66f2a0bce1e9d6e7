//! Core types shared across the spill tier.

use std::time::{SystemTime, UNIX_EPOCH};

/// Keyspace events the engine subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Fired just before the host evicts a key from RAM.
    PreEviction,

    /// Fired when a read targets a key absent from RAM, before the host
    /// finalizes the miss.
    PreMiss,
}

/// A command reply in the shape of the host's reply protocol.
///
/// The host adapter maps this onto its own wire primitives; error messages
/// carry no protocol prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Simple status string, e.g. "OK".
    Simple(String),

    /// Integer reply.
    Integer(i64),

    /// Null reply (key not found).
    Null,

    /// Array reply.
    Array(Vec<Reply>),

    /// Error reply.
    Error(String),
}

impl Reply {
    /// The canonical success reply.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Build a simple status reply.
    pub fn simple(s: impl Into<String>) -> Self {
        Reply::Simple(s.into())
    }

    /// Build an error reply.
    pub fn error(msg: impl ToString) -> Self {
        Reply::Error(msg.to_string())
    }

    /// Whether this reply is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Current wall-clock time in seconds since the Unix epoch.
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
