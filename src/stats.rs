//! Process-wide spill counters.
//!
//! Mutated from the host's command thread and the sweeper thread; every
//! update is an atomic read-modify-write and every read a plain atomic load,
//! so the info hook can run without taking any lock that could contend with
//! the spill or restore paths.

use crate::host::InfoSink;
use crate::types::now_secs;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Atomic counters for the spill tier.
#[derive(Debug, Default)]
pub struct SpillStats {
    /// Live entries in the store: seeded at load, +1 on a new-key write,
    /// -1 on restore or sweep. Eventually consistent with the store.
    num_keys_stored: AtomicU64,

    /// Cumulative writes since load, overwrites included.
    total_keys_written: AtomicU64,

    /// Keys restored into the host since load.
    total_keys_restored: AtomicU64,

    /// Keys reclaimed by sweeps (periodic or on-demand) since load.
    total_keys_cleaned: AtomicU64,

    /// Keys reclaimed by the most recent sweep.
    last_num_keys_cleaned: AtomicU64,

    /// Unix timestamp (seconds) of the most recent sweep; 0 if never run.
    last_cleanup_at: AtomicI64,

    /// Bytes written since load, expiry headers included.
    total_bytes_written: AtomicU64,

    /// Bytes read on restore since load, expiry headers included.
    total_bytes_read: AtomicU64,

    /// Restores rejected by the host's materialize call.
    restore_failures: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub num_keys_stored: u64,
    pub total_keys_written: u64,
    pub total_keys_restored: u64,
    pub total_keys_cleaned: u64,
    pub last_num_keys_cleaned: u64,
    pub last_cleanup_at: i64,
    pub total_bytes_written: u64,
    pub total_bytes_read: u64,
    pub restore_failures: u64,
}

impl SpillStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the live-entry count from startup reconciliation.
    pub(crate) fn seed_stored(&self, count: u64) {
        self.num_keys_stored.store(count, Ordering::Relaxed);
    }

    /// Record a successful store write of `bytes` framed bytes.
    pub(crate) fn record_write(&self, bytes: u64, new_key: bool) {
        self.total_keys_written.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_written.fetch_add(bytes, Ordering::Relaxed);
        if new_key {
            self.num_keys_stored.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful restore that read `bytes` framed bytes.
    pub(crate) fn record_restore(&self, bytes: u64) {
        self.total_keys_restored.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.num_keys_stored.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a restore the host refused to materialize.
    pub(crate) fn record_restore_failure(&self) {
        self.restore_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an entry discarded because it was observed expired.
    pub(crate) fn record_expired_discard(&self) {
        self.num_keys_stored.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a completed sweep that reclaimed `cleaned` entries.
    pub(crate) fn record_sweep(&self, cleaned: u64) {
        self.total_keys_cleaned.fetch_add(cleaned, Ordering::Relaxed);
        self.last_num_keys_cleaned.store(cleaned, Ordering::Relaxed);
        self.last_cleanup_at.store(now_secs(), Ordering::Relaxed);
        self.num_keys_stored.fetch_sub(cleaned, Ordering::Relaxed);
    }

    /// Current live-entry count.
    pub fn num_keys_stored(&self) -> u64 {
        self.num_keys_stored.load(Ordering::Relaxed)
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            num_keys_stored: self.num_keys_stored.load(Ordering::Relaxed),
            total_keys_written: self.total_keys_written.load(Ordering::Relaxed),
            total_keys_restored: self.total_keys_restored.load(Ordering::Relaxed),
            total_keys_cleaned: self.total_keys_cleaned.load(Ordering::Relaxed),
            last_num_keys_cleaned: self.last_num_keys_cleaned.load(Ordering::Relaxed),
            last_cleanup_at: self.last_cleanup_at.load(Ordering::Relaxed),
            total_bytes_written: self.total_bytes_written.load(Ordering::Relaxed),
            total_bytes_read: self.total_bytes_read.load(Ordering::Relaxed),
            restore_failures: self.restore_failures.load(Ordering::Relaxed),
        }
    }

    /// Fill the `stats` info section.
    pub(crate) fn fill_info(&self, sink: &mut dyn InfoSink) {
        let snapshot = self.snapshot();
        sink.section("stats");
        sink.field_u64("num_keys_stored", snapshot.num_keys_stored);
        sink.field_u64("total_keys_written", snapshot.total_keys_written);
        sink.field_u64("total_keys_restored", snapshot.total_keys_restored);
        sink.field_u64("total_keys_cleaned", snapshot.total_keys_cleaned);
        sink.field_u64("last_num_keys_cleaned", snapshot.last_num_keys_cleaned);
        sink.field_i64("last_cleanup_at", snapshot.last_cleanup_at);
        sink.field_u64("total_bytes_written", snapshot.total_bytes_written);
        sink.field_u64("total_bytes_read", snapshot.total_bytes_read);
        sink.field_u64("restore_failures", snapshot.restore_failures);
    }
}
