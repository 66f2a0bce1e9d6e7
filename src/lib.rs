//! Disk spill tier for an in-memory key-value server.
//!
//! This crate turns a fixed-RAM cache into one that behaves as if unbounded:
//! it intercepts keys on the host's pre-eviction edge, persists their opaque
//! serialized form to a local RocksDB store with an absolute-expiry header,
//! and transparently rehydrates them on the pre-miss edge — preserving
//! expiration across the round trip. A background sweeper reclaims entries
//! whose deadline has passed.
//!
//! # Features
//!
//! - Capture on eviction: payload + remaining TTL framed as `expiry8 ‖ payload`
//! - Restore on miss or by explicit command, with the relative TTL rebuilt
//! - Periodic and on-demand sweeping of expired entries
//! - Atomic counters surfaced through the host's info hook
//! - RocksDB tuned for bursty writes and point-lookup reads within a fixed
//!   RAM budget
//!
//! # Example
//!
//! ```rust,no_run
//! use spillover::{EventKind, MockHost, SpillConfig, SpillEngine};
//! use std::sync::Arc;
//!
//! # fn main() -> spillover::Result<()> {
//! // A real deployment implements spillover::Host over the server's module
//! // API; the mock stands in for it here.
//! let host = Arc::new(MockHost::new());
//!
//! let config = SpillConfig::new("./spill-data")
//!     .with_max_memory(64 * 1024 * 1024)
//!     .with_cleanup_interval(300);
//! let engine = SpillEngine::new(config, host.clone())?;
//!
//! // Wired into the host's keyspace-event subscription:
//! engine.handle_keyspace_event(EventKind::PreEviction, b"user:42");
//! engine.handle_keyspace_event(EventKind::PreMiss, b"user:42");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              Host server                   │
//! │   eviction ─┐            ┌─ miss           │
//! └─────────────┼────────────┼─────────────────┘
//!               ▼            ▼
//! ┌────────────────────────────────────────────┐
//! │               SpillEngine                  │
//! │  capture ──► [expiry8 ‖ payload] ──► store │
//! │  restore ◄── decode + TTL rebuild ◄─ store │
//! │  sweeper ──► delete expired entries        │
//! └─────────────────────┬──────────────────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │   RocksDB    │
//!               └──────────────┘
//! ```
//!
//! # Concurrency model
//!
//! The host invokes every callback and command on its single command thread;
//! the engine adds exactly one thread of its own, the periodic sweeper.
//! Counters are atomics, the store relies on RocksDB's internal
//! synchronization, and shutdown joins the sweeper behind a stop flag.

pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod host;
pub mod stats;
pub mod store;
pub mod testing;
pub mod types;

// Re-export main types for convenience
pub use config::SpillConfig;
pub use engine::SpillEngine;
pub use error::{Error, HostError, Result, StoreError};
pub use host::{Host, InfoSink, PTTL_KEY_ABSENT, PTTL_NO_EXPIRY};
pub use stats::{SpillStats, StatsSnapshot};
pub use store::SpillStore;
pub use types::{EventKind, Reply};

// Re-export the mock host for embedders' own tests
pub use testing::MockHost;
