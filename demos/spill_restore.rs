//! Walkthrough of the spill/restore cycle against an in-memory mock host.

use spillover::{EventKind, MockHost, Reply, SpillConfig, SpillEngine};
use std::sync::Arc;

fn main() -> spillover::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("spillover=debug,info")
        .init();

    let dir = std::env::temp_dir().join("spillover-demo");
    let config = SpillConfig::new(&dir)
        .with_max_memory(20 * 1024 * 1024)
        .with_cleanup_interval(0);

    let host = Arc::new(MockHost::new());
    let engine = SpillEngine::new(config, host.clone())?;

    // A key living in the host's RAM, 60 seconds left on its TTL.
    host.insert_live("user:42", &b"profile-bytes"[..], 60_000);

    // The host is about to evict it; the pre-eviction edge fires first.
    engine.handle_keyspace_event(EventKind::PreEviction, b"user:42");
    host.evict_live(b"user:42");
    println!("spilled; still live in host: {}", host.is_live(b"user:42"));

    // The next read misses in RAM; the pre-miss edge rehydrates it.
    engine.handle_keyspace_event(EventKind::PreMiss, b"user:42");
    let call = host.last_materialize().expect("key should be restored");
    println!(
        "restored; payload={:?}, ttl_ms={}",
        String::from_utf8_lossy(&call.payload),
        call.ttl_ms
    );

    // A successful restore consumes the on-disk entry.
    match engine.restore_command(b"user:42") {
        Reply::Null => println!("entry consumed by the restore"),
        other => println!("unexpected reply: {other:?}"),
    }

    let stats = engine.stats().snapshot();
    println!(
        "written={} restored={} stored={}",
        stats.total_keys_written, stats.total_keys_restored, stats.num_keys_stored
    );

    engine.shutdown();
    Ok(())
}
