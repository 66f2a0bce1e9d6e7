//! An in-memory host double.

use crate::error::HostError;
use crate::host::{Host, PTTL_KEY_ABSENT};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;

/// One recorded materialize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeCall {
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
    pub ttl_ms: i64,
}

#[derive(Debug, Clone)]
struct LiveKey {
    payload: Bytes,
    pttl_ms: i64,
}

#[derive(Debug, Default)]
struct MockHostState {
    live: HashMap<Vec<u8>, LiveKey>,
    materialized: Vec<MaterializeCall>,
    materialize_error: Option<String>,
}

/// A scriptable [`Host`] implementation.
///
/// "Live" keys are what the host would hold in RAM: `serialize` and
/// `remaining_ttl_ms` answer from them, and a successful `materialize`
/// inserts into them (replace semantics).
#[derive(Debug, Default)]
pub struct MockHost {
    state: Mutex<MockHostState>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live key with the payload its serializer would produce and the
    /// value its TTL probe would report.
    pub fn insert_live(&self, key: impl Into<Vec<u8>>, payload: impl Into<Bytes>, pttl_ms: i64) {
        self.state.lock().live.insert(
            key.into(),
            LiveKey {
                payload: payload.into(),
                pttl_ms,
            },
        );
    }

    /// Drop a live key, as the host's eviction would.
    pub fn evict_live(&self, key: &[u8]) {
        self.state.lock().live.remove(key);
    }

    /// Whether the host currently holds the key in RAM.
    pub fn is_live(&self, key: &[u8]) -> bool {
        self.state.lock().live.contains_key(key)
    }

    /// Make every materialize call fail with the given message, or succeed
    /// again with `None`.
    pub fn set_materialize_error(&self, error: Option<&str>) {
        self.state.lock().materialize_error = error.map(str::to_string);
    }

    /// Every materialize call recorded so far, in order.
    pub fn materialize_calls(&self) -> Vec<MaterializeCall> {
        self.state.lock().materialized.clone()
    }

    /// The most recent materialize call.
    pub fn last_materialize(&self) -> Option<MaterializeCall> {
        self.state.lock().materialized.last().cloned()
    }
}

impl Host for MockHost {
    fn serialize(&self, key: &[u8]) -> Result<Bytes, HostError> {
        self.state
            .lock()
            .live
            .get(key)
            .map(|live| live.payload.clone())
            .ok_or_else(|| HostError::Serialize("no such key".to_string()))
    }

    fn remaining_ttl_ms(&self, key: &[u8]) -> Result<i64, HostError> {
        Ok(self
            .state
            .lock()
            .live
            .get(key)
            .map(|live| live.pttl_ms)
            .unwrap_or(PTTL_KEY_ABSENT))
    }

    fn materialize(&self, key: &[u8], payload: &[u8], ttl_ms: i64) -> Result<(), HostError> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.materialize_error {
            return Err(HostError::Materialize(msg.clone()));
        }

        state.materialized.push(MaterializeCall {
            key: key.to_vec(),
            payload: payload.to_vec(),
            ttl_ms,
        });
        state.live.insert(
            key.to_vec(),
            LiveKey {
                payload: Bytes::copy_from_slice(payload),
                pttl_ms: if ttl_ms > 0 { ttl_ms } else { -1 },
            },
        );
        Ok(())
    }
}
