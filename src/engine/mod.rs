//! The spill engine.
//!
//! [`SpillEngine`] owns the process-wide spill state: the open store, the
//! atomic counters, and the sweeper thread. The host adapter forwards
//! keyspace events to [`SpillEngine::handle_keyspace_event`] and wires the
//! restore/cleanup commands and the info hook to the matching methods.
//!
//! # Event paths
//!
//! - **Pre-eviction**: serialize the key through the host, frame the payload
//!   behind an absolute-expiry header, write it to the store.
//! - **Pre-miss**: read the framed entry, discard it if expired, otherwise
//!   ask the host to materialize the key with the reconstructed TTL and
//!   delete the entry only once the host confirms.
//!
//! Both run synchronously on the host's command thread; the only other
//! thread touching the store or counters is the periodic sweeper.

mod sweeper;

use crate::config::SpillConfig;
use crate::entry;
use crate::error::{Error, HostError, Result, StoreError};
use crate::host::{Host, InfoSink, PTTL_NO_EXPIRY};
use crate::stats::SpillStats;
use crate::store::SpillStore;
use crate::types::{now_ms, EventKind, Reply};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of the shared restore routine, consumed by both the pre-miss
/// callback and the restore command.
#[derive(Debug)]
enum RestoreOutcome {
    /// Materialized in the host; entry deleted.
    Restored,

    /// No entry for the key.
    NotFound,

    /// Entry was past its expiry; deleted without materializing.
    Expired,

    /// Value shorter than the expiry header; left in place.
    Corrupted,

    /// The store failed the read.
    StoreFailed(StoreError),

    /// The host refused to materialize; entry left intact.
    HostRejected(HostError),
}

/// The spill tier engine.
///
/// Created at module load, shut down (and dropped) at unload. All methods
/// take `&self`; the engine is shared between the host thread and its own
/// sweeper thread.
pub struct SpillEngine {
    config: SpillConfig,

    host: Arc<dyn Host>,

    /// Store lifecycle slot: `Some` while open, emptied by shutdown.
    store: RwLock<Option<Arc<SpillStore>>>,

    stats: Arc<SpillStats>,

    sweeper_stop: Arc<AtomicBool>,

    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SpillEngine {
    /// Open the store, reconcile the live-entry count, and start the
    /// sweeper when a period is configured.
    ///
    /// Fails on invalid configuration or a store that refuses to open;
    /// resources acquired before the failure are released on unwind.
    pub fn new(config: SpillConfig, host: Arc<dyn Host>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(SpillStore::open(&config)?);
        let stats = Arc::new(SpillStats::new());

        let live = count_live(&store);
        stats.seed_stored(live);
        info!(live_entries = live, "startup reconciliation finished");

        let sweeper_stop = Arc::new(AtomicBool::new(false));
        let sweeper = if config.cleanup_interval > 0 {
            let spawned = sweeper::spawn(
                store.clone(),
                stats.clone(),
                sweeper_stop.clone(),
                Duration::from_secs(config.cleanup_interval),
            );
            match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    // Not fatal: the spill paths work without reclamation.
                    warn!(error = %e, "failed to start sweeper thread, periodic cleanup disabled");
                    None
                }
            }
        } else {
            info!("periodic cleanup disabled (cleanup_interval=0)");
            None
        };

        info!(
            path = %config.path.display(),
            max_memory_mb = config.max_memory / (1024 * 1024),
            cleanup_interval_secs = config.cleanup_interval,
            "spill engine ready"
        );

        Ok(Self {
            config,
            host,
            store: RwLock::new(Some(store)),
            stats,
            sweeper_stop,
            sweeper: Mutex::new(sweeper),
        })
    }

    /// Stop the sweeper, close the store, and log a lifetime summary.
    ///
    /// Idempotent; also invoked from `Drop`. Callbacks and commands arriving
    /// afterwards observe the closed store and no-op.
    pub fn shutdown(&self) {
        self.sweeper_stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.sweeper.lock().take() {
            if handle.join().is_err() {
                warn!("sweeper thread panicked");
            }
        }

        if self.store.write().take().is_some() {
            let snapshot = self.stats.snapshot();
            info!(
                stored = snapshot.num_keys_stored,
                restored = snapshot.total_keys_restored,
                cleaned = snapshot.total_keys_cleaned,
                "spill engine shut down"
            );
        }
    }

    /// Dispatch a keyspace event from the host.
    ///
    /// Never fails: callback paths log and swallow every error.
    pub fn handle_keyspace_event(&self, event: EventKind, key: &[u8]) {
        match event {
            EventKind::PreEviction => self.capture(key),
            EventKind::PreMiss => self.on_miss(key),
        }
    }

    /// The explicit restore command.
    ///
    /// Adapters register this as a write command taking exactly one key
    /// (first=1, last=1, step=1). Replies `OK` on success, null when no
    /// entry exists, or an error naming what went wrong.
    pub fn restore_command(&self, key: &[u8]) -> Reply {
        let Some(store) = self.open_store() else {
            return Reply::error(Error::NotInitialized);
        };
        if key.is_empty() {
            return Reply::error("invalid key");
        }

        match self.restore_key(&store, key) {
            RestoreOutcome::Restored => Reply::ok(),
            RestoreOutcome::NotFound => Reply::Null,
            RestoreOutcome::Expired => Reply::error(Error::Expired),
            RestoreOutcome::Corrupted => Reply::error(Error::Corrupted),
            RestoreOutcome::StoreFailed(e) => Reply::error(e),
            RestoreOutcome::HostRejected(e) => Reply::error(e),
        }
    }

    /// The on-demand cleanup command: one synchronous sweep.
    ///
    /// Adapters register this as a write command with no key positions.
    /// Replies `["num_keys_scanned", <n>, "num_keys_cleaned", <n>]`.
    pub fn cleanup_command(&self) -> Reply {
        let Some(store) = self.open_store() else {
            return Reply::error(Error::NotInitialized);
        };

        let (report, scan_error) = sweeper::sweep(&store, &self.stats, None);
        if let Some(e) = scan_error {
            return Reply::error(e);
        }

        Reply::Array(vec![
            Reply::simple("num_keys_scanned"),
            Reply::Integer(report.scanned as i64),
            Reply::simple("num_keys_cleaned"),
            Reply::Integer(report.cleaned as i64),
        ])
    }

    /// Fill the host's info hook with the `stats` and `config` sections.
    ///
    /// Lock-free with respect to the spill and restore paths.
    pub fn fill_info(&self, sink: &mut dyn InfoSink) {
        self.stats.fill_info(sink);

        sink.section("config");
        sink.field_str("path", &self.config.path.to_string_lossy());
        sink.field_u64("max_memory_bytes", self.config.max_memory as u64);
        sink.field_u64("cleanup_interval_seconds", self.config.cleanup_interval);
    }

    /// The engine's counters.
    pub fn stats(&self) -> &SpillStats {
        &self.stats
    }

    /// The engine's configuration.
    pub fn config(&self) -> &SpillConfig {
        &self.config
    }

    fn open_store(&self) -> Option<Arc<SpillStore>> {
        self.store.read().clone()
    }

    /// Pre-eviction path: capture the key into the store.
    fn capture(&self, key: &[u8]) {
        let Some(store) = self.open_store() else {
            debug!("pre-eviction event ignored, store not open");
            return;
        };

        let payload = match self.host.serialize(key) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    key = %String::from_utf8_lossy(key),
                    error = %e,
                    "serialize failed, key not spilled"
                );
                return;
            }
        };

        // A failed probe is treated as "no TTL known"; negative sentinels
        // are stored verbatim and read back as "no expiry".
        let pttl = match self.host.remaining_ttl_ms(key) {
            Ok(pttl) => pttl,
            Err(e) => {
                debug!(error = %e, "ttl probe failed, spilling without expiry");
                PTTL_NO_EXPIRY
            }
        };
        let expiry_ms = if pttl > 0 { now_ms() + pttl } else { pttl };

        let value = entry::encode(expiry_ms, &payload);

        // Best-effort existence probe deciding whether this write is a new
        // logical insertion; a probe error counts as an overwrite.
        let new_key = match store.get(key) {
            Ok(existing) => existing.is_none(),
            Err(e) => {
                debug!(error = %e, "existence probe failed before spill");
                false
            }
        };

        match store.put(key, &value) {
            Ok(()) => {
                self.stats.record_write(value.len() as u64, new_key);
                debug!(
                    key = %String::from_utf8_lossy(key),
                    bytes = value.len(),
                    expiry_ms,
                    "key spilled"
                );
            }
            Err(e) => {
                warn!(
                    key = %String::from_utf8_lossy(key),
                    error = %e,
                    "failed to persist evicted key"
                );
            }
        }
    }

    /// Pre-miss path: rehydrate the key if it was spilled.
    fn on_miss(&self, key: &[u8]) {
        let Some(store) = self.open_store() else {
            debug!("pre-miss event ignored, store not open");
            return;
        };

        match self.restore_key(&store, key) {
            RestoreOutcome::Restored => {
                debug!(key = %String::from_utf8_lossy(key), "key restored on miss");
            }
            RestoreOutcome::NotFound => {}
            RestoreOutcome::Expired => {
                debug!(key = %String::from_utf8_lossy(key), "expired entry discarded on miss");
            }
            RestoreOutcome::Corrupted => {
                warn!(key = %String::from_utf8_lossy(key), "corrupted entry observed on miss");
            }
            RestoreOutcome::StoreFailed(e) => {
                warn!(key = %String::from_utf8_lossy(key), error = %e, "store read failed on miss");
            }
            RestoreOutcome::HostRejected(e) => {
                warn!(key = %String::from_utf8_lossy(key), error = %e, "host refused restore");
            }
        }
    }

    /// Shared restore routine.
    ///
    /// The entry is deleted only after the host confirms materialization; a
    /// rejected materialization leaves it intact for a later attempt.
    fn restore_key(&self, store: &SpillStore, key: &[u8]) -> RestoreOutcome {
        let value = match store.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return RestoreOutcome::NotFound,
            Err(e) => return RestoreOutcome::StoreFailed(e),
        };

        let (expiry_ms, payload) = match entry::decode(&value) {
            Ok(parts) => parts,
            Err(_) => return RestoreOutcome::Corrupted,
        };

        let now = now_ms();
        if entry::is_expired(expiry_ms, now) {
            self.delete_entry(store, key);
            self.stats.record_expired_discard();
            return RestoreOutcome::Expired;
        }

        let ttl_ms = entry::restore_ttl_ms(expiry_ms, now);
        match self.host.materialize(key, payload, ttl_ms) {
            Ok(()) => {
                self.delete_entry(store, key);
                self.stats.record_restore(value.len() as u64);
                RestoreOutcome::Restored
            }
            Err(e) => {
                self.stats.record_restore_failure();
                RestoreOutcome::HostRejected(e)
            }
        }
    }

    fn delete_entry(&self, store: &SpillStore, key: &[u8]) {
        if let Err(e) = store.delete(key) {
            warn!(
                key = %String::from_utf8_lossy(key),
                error = %e,
                "failed to delete entry from store"
            );
        }
    }
}

impl Drop for SpillEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SpillEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpillEngine")
            .field("config", &self.config)
            .field("open", &self.store.read().is_some())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

/// Startup reconciliation: count entries that are live right now, i.e.
/// without expiry (sentinels included) or with a deadline still ahead.
fn count_live(store: &SpillStore) -> u64 {
    let now = now_ms();
    let mut live = 0;

    for item in store.scan() {
        match item {
            Ok((_, value)) => {
                if let Some(expiry_ms) = entry::decode_expiry(&value) {
                    if expiry_ms <= 0 || expiry_ms > now {
                        live += 1;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "startup reconciliation scan error");
                break;
            }
        }
    }

    live
}
