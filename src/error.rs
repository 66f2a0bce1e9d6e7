//! Error types for the spill tier.

use thiserror::Error;

/// Result type alias for spill tier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the spill tier.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors. Fatal at load time.
    #[error("config error: {0}")]
    Config(String),

    /// Embedded store errors.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Host call errors (serialize, TTL probe, materialize).
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// The store is not in the open state.
    #[error("spill store not initialized")]
    NotInitialized,

    /// A stored value is shorter than the expiry header.
    #[error("corrupted entry in spill store")]
    Corrupted,

    /// The entry's absolute expiry has passed.
    #[error("key has expired")]
    Expired,
}

/// Embedded store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused to open.
    #[error("failed to open store: {0}")]
    Open(String),

    /// A point operation (get/put/delete) failed.
    #[error("store io error: {0}")]
    Io(String),

    /// A forward scan reported an error.
    #[error("store iterator error: {0}")]
    Iter(String),
}

/// Errors surfaced by the host across the module boundary.
///
/// Host adapters construct these from their own reply protocol; the engine
/// never inspects the message beyond logging or echoing it in a command reply.
#[derive(Error, Debug)]
pub enum HostError {
    /// The host could not serialize the key to a payload.
    #[error("serialize failed: {0}")]
    Serialize(String),

    /// The TTL probe failed or returned a non-integer reply.
    #[error("ttl probe failed: {0}")]
    TtlProbe(String),

    /// The host rejected materialization of a restored key.
    #[error("materialize failed: {0}")]
    Materialize(String),
}
