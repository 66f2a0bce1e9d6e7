//! RocksDB-backed spill store.
//!
//! One flat keyspace: host key bytes map to framed entry values (see
//! [`crate::entry`]). The store is tuned for the spill workload — bursty
//! writes on the eviction edge, point lookups on the miss edge — within the
//! configured RAM budget: an 8 MiB block cache for reads, two thirds of the
//! remainder for write buffers, the last third left to indexes, bloom
//! filters, and engine overhead.
//!
//! # Thread safety
//!
//! The handle is shared between the host's command thread and the sweeper
//! thread; RocksDB's own synchronization covers concurrent put/get/delete/
//! iterate, and the store adds no locks. `ReadOptions`/`WriteOptions` are
//! not shareable across threads in the `rocksdb` crate, so they are built
//! per call.
//!
//! Dropping the store closes the database and releases its options and
//! caches.

use crate::config::SpillConfig;
use crate::error::StoreError;
use rocksdb::{
    BlockBasedOptions, Cache, DBCompressionType, IteratorMode, Options, ReadOptions, WriteOptions,
    DB,
};
use tracing::info;

/// Block cache reserved for reads, carved out of the RAM budget first.
const BLOCK_CACHE_SIZE: usize = 8 * 1024 * 1024;

/// Target SST file size.
const TARGET_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Bloom filter bits per key (~1% false positives).
const BLOOM_BITS_PER_KEY: f64 = 10.0;

/// RocksDB database holding spilled entries.
pub struct SpillStore {
    db: DB,
}

impl SpillStore {
    /// Open (creating if missing) the store under `config.path`.
    pub fn open(config: &SpillConfig) -> Result<Self, StoreError> {
        let write_buffer_size = config.max_memory.saturating_sub(BLOCK_CACHE_SIZE) * 2 / 3;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_error_if_exists(false);
        // Strict corruption detection traded for write latency on the
        // eviction path.
        opts.set_paranoid_checks(false);
        opts.set_compression_type(DBCompressionType::Snappy);
        opts.set_write_buffer_size(write_buffer_size);
        opts.set_max_write_buffer_number(3);
        opts.set_max_open_files(1000);
        // Restores are single-key gets; size the point-lookup tuning to the
        // block cache.
        opts.optimize_for_point_lookup((BLOCK_CACHE_SIZE / (1024 * 1024)) as u64);
        opts.set_allow_mmap_reads(false);
        opts.set_allow_mmap_writes(false);
        // Cap background work so compaction does not contend with the host.
        opts.set_max_background_jobs(2);
        opts.set_level_compaction_dynamic_level_bytes(true);
        opts.set_target_file_size_base(TARGET_FILE_SIZE);

        let mut table_opts = BlockBasedOptions::default();
        let cache = Cache::new_lru_cache(BLOCK_CACHE_SIZE);
        table_opts.set_block_cache(&cache);
        table_opts.set_bloom_filter(BLOOM_BITS_PER_KEY, false);
        table_opts.set_block_size(4 * 1024);
        table_opts.set_block_restart_interval(16);
        table_opts.set_cache_index_and_filter_blocks(true);
        table_opts.set_pin_l0_filter_and_index_blocks_in_cache(true);
        opts.set_block_based_table_factory(&table_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| StoreError::Open(e.to_string()))?;

        info!(
            path = %config.path.display(),
            block_cache_mb = BLOCK_CACHE_SIZE / (1024 * 1024),
            write_buffer_mb = write_buffer_size / (1024 * 1024),
            "spill store opened"
        );

        Ok(Self { db })
    }

    /// Checksum verification stays off: reads sit on the cache-miss path and
    /// favor latency over at-rest integrity.
    fn read_opts() -> ReadOptions {
        let mut opts = ReadOptions::default();
        opts.set_verify_checksums(false);
        opts.fill_cache(true);
        opts
    }

    /// No per-write fsync; crash safety rides on the WAL.
    fn write_opts() -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(false);
        opts.disable_wal(false);
        opts
    }

    /// Point-get a framed entry value.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db
            .get_opt(key, &Self::read_opts())
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Write a framed entry value, overwriting any prior entry for the key.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db
            .put_opt(key, value, &Self::write_opts())
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Delete the entry for the key, if any.
    pub fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .delete_opt(key, &Self::write_opts())
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Forward scan over every entry, in key order.
    pub fn scan(
        &self,
    ) -> impl Iterator<Item = Result<(Box<[u8]>, Box<[u8]>), StoreError>> + '_ {
        self.db
            .iterator_opt(IteratorMode::Start, Self::read_opts())
            .map(|item| item.map_err(|e| StoreError::Iter(e.to_string())))
    }
}

impl std::fmt::Debug for SpillStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpillStore")
            .field("path", &self.db.path())
            .finish()
    }
}
