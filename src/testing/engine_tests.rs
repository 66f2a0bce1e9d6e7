//! End-to-end scenarios driving the engine through a mock host.

use crate::config::{SpillConfig, MIN_MAX_MEMORY};
use crate::engine::SpillEngine;
use crate::host::InfoSink;
use crate::store::SpillStore;
use crate::testing::MockHost;
use crate::types::{EventKind, Reply};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> SpillConfig {
    SpillConfig::new(dir.path())
        .with_max_memory(MIN_MAX_MEMORY)
        .with_cleanup_interval(0)
}

fn setup() -> (SpillEngine, Arc<MockHost>, TempDir) {
    let dir = TempDir::new().unwrap();
    let host = Arc::new(MockHost::new());
    let engine = SpillEngine::new(test_config(&dir), host.clone()).unwrap();
    (engine, host, dir)
}

/// Capture a live key through the pre-eviction edge and drop it from the
/// mock host's RAM, as the host's eviction would.
fn evict(engine: &SpillEngine, host: &MockHost, key: &[u8]) {
    engine.handle_keyspace_event(EventKind::PreEviction, key);
    host.evict_live(key);
}

#[test]
fn test_finite_ttl_round_trip() {
    let (engine, host, _dir) = setup();
    host.insert_live("foo", &b"\x01\x02\x03"[..], 60_000);

    evict(&engine, &host, b"foo");
    assert!(!host.is_live(b"foo"));

    engine.handle_keyspace_event(EventKind::PreMiss, b"foo");

    let call = host.last_materialize().expect("key should be materialized");
    assert_eq!(call.key, b"foo");
    assert_eq!(call.payload, b"\x01\x02\x03");
    assert!(
        call.ttl_ms > 55_000 && call.ttl_ms <= 60_000,
        "restored TTL {} out of range",
        call.ttl_ms
    );
    assert!(host.is_live(b"foo"));

    // Entry is gone after a successful restore.
    assert_eq!(engine.restore_command(b"foo"), Reply::Null);

    let snapshot = engine.stats().snapshot();
    assert_eq!(snapshot.total_keys_written, 1);
    assert_eq!(snapshot.total_keys_restored, 1);
    assert_eq!(snapshot.num_keys_stored, 0);
    assert_eq!(snapshot.total_bytes_written, 8 + 3);
    assert_eq!(snapshot.total_bytes_read, 8 + 3);
}

#[test]
fn test_no_ttl_round_trip() {
    let (engine, host, _dir) = setup();
    host.insert_live("bar", &b"abc"[..], -1);

    evict(&engine, &host, b"bar");
    engine.handle_keyspace_event(EventKind::PreMiss, b"bar");

    let call = host.last_materialize().unwrap();
    assert_eq!(call.payload, b"abc");
    assert_eq!(call.ttl_ms, 0);
}

#[test]
fn test_empty_and_binary_payloads_round_trip() {
    let (engine, host, _dir) = setup();
    host.insert_live("empty", &b""[..], -1);
    host.insert_live("binary", &b"a\x00b\x00\xff"[..], -1);

    evict(&engine, &host, b"empty");
    evict(&engine, &host, b"binary");

    assert_eq!(engine.restore_command(b"empty"), Reply::ok());
    assert_eq!(engine.restore_command(b"binary"), Reply::ok());

    let calls = host.materialize_calls();
    assert_eq!(calls[0].payload, b"");
    assert_eq!(calls[1].payload, b"a\x00b\x00\xff");
}

#[test]
fn test_long_key_round_trip() {
    let (engine, host, _dir) = setup();
    let key = vec![0xabu8; 512];
    host.insert_live(key.clone(), &b"v"[..], -1);

    evict(&engine, &host, &key);
    assert_eq!(engine.restore_command(&key), Reply::ok());
    assert_eq!(host.last_materialize().unwrap().key, key);
}

#[test]
fn test_expired_on_restore() {
    let (engine, host, _dir) = setup();
    host.insert_live("gone", &b"x"[..], 10);

    evict(&engine, &host, b"gone");
    assert_eq!(engine.stats().num_keys_stored(), 1);

    sleep(Duration::from_millis(50));

    let reply = engine.restore_command(b"gone");
    assert_eq!(reply, Reply::error("key has expired"));
    assert!(host.materialize_calls().is_empty());
    assert_eq!(engine.stats().num_keys_stored(), 0);

    // The expired entry was deleted, not just skipped.
    assert_eq!(engine.restore_command(b"gone"), Reply::Null);
}

#[test]
fn test_expired_on_miss_is_discarded_silently() {
    let (engine, host, _dir) = setup();
    host.insert_live("gone", &b"x"[..], 10);

    evict(&engine, &host, b"gone");
    sleep(Duration::from_millis(50));

    engine.handle_keyspace_event(EventKind::PreMiss, b"gone");

    assert!(host.materialize_calls().is_empty());
    assert!(!host.is_live(b"gone"));
    assert_eq!(engine.restore_command(b"gone"), Reply::Null);
}

#[test]
fn test_overwrite_keeps_latest_capture() {
    let (engine, host, _dir) = setup();

    host.insert_live("k", &b"v1"[..], -1);
    engine.handle_keyspace_event(EventKind::PreEviction, b"k");
    host.insert_live("k", &b"v2"[..], -1);
    evict(&engine, &host, b"k");

    let snapshot = engine.stats().snapshot();
    assert_eq!(snapshot.num_keys_stored, 1);
    assert_eq!(snapshot.total_keys_written, 2);

    assert_eq!(engine.restore_command(b"k"), Reply::ok());
    assert_eq!(host.last_materialize().unwrap().payload, b"v2");
}

#[test]
fn test_cleanup_command_sweeps_expired() {
    let (engine, host, _dir) = setup();

    for key in [&b"e1"[..], b"e2", b"e3"] {
        host.insert_live(key, &b"x"[..], 10);
        evict(&engine, &host, key);
    }
    for key in [&b"p1"[..], b"p2"] {
        host.insert_live(key, &b"y"[..], -1);
        evict(&engine, &host, key);
    }

    sleep(Duration::from_millis(50));

    let reply = engine.cleanup_command();
    assert_eq!(
        reply,
        Reply::Array(vec![
            Reply::simple("num_keys_scanned"),
            Reply::Integer(5),
            Reply::simple("num_keys_cleaned"),
            Reply::Integer(3),
        ])
    );

    let snapshot = engine.stats().snapshot();
    assert_eq!(snapshot.total_keys_cleaned, 3);
    assert_eq!(snapshot.last_num_keys_cleaned, 3);
    assert!(snapshot.last_cleanup_at > 0);
    assert_eq!(snapshot.num_keys_stored, 2);

    // Permanent keys survived the sweep.
    assert_eq!(engine.restore_command(b"p1"), Reply::ok());
    assert_eq!(engine.restore_command(b"p2"), Reply::ok());
}

#[test]
fn test_corrupted_entry_is_reported_and_left_in_place() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    // Inject a value shorter than the expiry header, bypassing the engine.
    {
        let store = SpillStore::open(&config).unwrap();
        store.put(b"bad", b"\xde\xad\xbe\xef").unwrap();
    }

    let host = Arc::new(MockHost::new());
    let engine = SpillEngine::new(config, host.clone()).unwrap();

    let reply = engine.restore_command(b"bad");
    assert_eq!(reply, Reply::error("corrupted entry in spill store"));
    assert!(host.materialize_calls().is_empty());

    // The value stays put; a second attempt reports the same corruption.
    assert_eq!(engine.restore_command(b"bad"), reply);
}

#[test]
fn test_materialize_failure_leaves_entry_intact() {
    let (engine, host, _dir) = setup();
    host.insert_live("k", &b"v"[..], -1);
    evict(&engine, &host, b"k");

    host.set_materialize_error(Some("host is busy"));
    engine.handle_keyspace_event(EventKind::PreMiss, b"k");
    assert!(!host.is_live(b"k"));
    assert_eq!(engine.stats().snapshot().restore_failures, 1);

    let reply = engine.restore_command(b"k");
    assert!(reply.is_error());
    assert_eq!(engine.stats().snapshot().restore_failures, 2);

    // Once the host recovers, the entry is still there to restore.
    host.set_materialize_error(None);
    assert_eq!(engine.restore_command(b"k"), Reply::ok());
    assert!(host.is_live(b"k"));
    assert_eq!(engine.stats().num_keys_stored(), 0);
}

#[test]
fn test_eviction_of_unknown_key_writes_nothing() {
    let (engine, host, _dir) = setup();

    // Serialize fails because the host has no such key.
    engine.handle_keyspace_event(EventKind::PreEviction, b"ghost");

    assert_eq!(engine.stats().snapshot().total_keys_written, 0);
    assert_eq!(engine.restore_command(b"ghost"), Reply::Null);
    let _ = host;
}

#[test]
fn test_miss_for_never_spilled_key_is_a_noop() {
    let (engine, host, _dir) = setup();

    engine.handle_keyspace_event(EventKind::PreMiss, b"never-seen");
    assert!(host.materialize_calls().is_empty());
}

#[test]
fn test_empty_key_rejected_by_restore_command() {
    let (engine, _host, _dir) = setup();
    assert_eq!(engine.restore_command(b""), Reply::error("invalid key"));
}

#[test]
fn test_commands_after_shutdown_report_not_initialized() {
    let (engine, host, _dir) = setup();
    host.insert_live("k", &b"v"[..], -1);
    evict(&engine, &host, b"k");

    engine.shutdown();

    let not_init = Reply::error("spill store not initialized");
    assert_eq!(engine.restore_command(b"k"), not_init);
    assert_eq!(engine.cleanup_command(), not_init);

    // Callback paths no-op against the closed store.
    engine.handle_keyspace_event(EventKind::PreMiss, b"k");
    assert!(host.materialize_calls().is_empty());

    // Shutdown is idempotent.
    engine.shutdown();
}

#[test]
fn test_startup_reconciliation_counts_live_entries() {
    let dir = TempDir::new().unwrap();
    let host = Arc::new(MockHost::new());

    {
        let engine = SpillEngine::new(test_config(&dir), host.clone()).unwrap();
        for key in [&b"a"[..], b"b"] {
            host.insert_live(key, &b"v"[..], -1);
            evict(&engine, &host, key);
        }
        host.insert_live("short-lived", &b"v"[..], 10);
        evict(&engine, &host, b"short-lived");
        assert_eq!(engine.stats().num_keys_stored(), 3);
    }

    sleep(Duration::from_millis(50));

    // The expired entry does not count as live after reopen.
    let engine = SpillEngine::new(test_config(&dir), host).unwrap();
    assert_eq!(engine.stats().num_keys_stored(), 2);
}

#[test]
fn test_periodic_sweeper_starts_and_joins() {
    let dir = TempDir::new().unwrap();
    let host = Arc::new(MockHost::new());
    let config = SpillConfig::new(dir.path())
        .with_max_memory(MIN_MAX_MEMORY)
        .with_cleanup_interval(60);

    let engine = SpillEngine::new(config, host).unwrap();
    // Teardown must not wait for the full interval.
    engine.shutdown();
}

#[derive(Default)]
struct RecordingSink {
    lines: Vec<String>,
}

impl InfoSink for RecordingSink {
    fn section(&mut self, name: &str) {
        self.lines.push(format!("# {name}"));
    }

    fn field_u64(&mut self, name: &str, value: u64) {
        self.lines.push(format!("{name}:{value}"));
    }

    fn field_i64(&mut self, name: &str, value: i64) {
        self.lines.push(format!("{name}:{value}"));
    }

    fn field_str(&mut self, name: &str, value: &str) {
        self.lines.push(format!("{name}:{value}"));
    }
}

#[test]
fn test_info_sections_and_fields() {
    let (engine, host, _dir) = setup();
    host.insert_live("k", &b"vvv"[..], -1);
    evict(&engine, &host, b"k");

    let mut sink = RecordingSink::default();
    engine.fill_info(&mut sink);

    assert!(sink.lines.contains(&"# stats".to_string()));
    assert!(sink.lines.contains(&"# config".to_string()));
    assert!(sink.lines.contains(&"num_keys_stored:1".to_string()));
    assert!(sink.lines.contains(&"total_keys_written:1".to_string()));
    assert!(sink.lines.contains(&"total_bytes_written:11".to_string()));
    assert!(sink
        .lines
        .contains(&"cleanup_interval_seconds:0".to_string()));
    let max_memory_line = format!("max_memory_bytes:{MIN_MAX_MEMORY}");
    assert!(sink.lines.contains(&max_memory_line));
}
