//! Expired-entry reclamation.
//!
//! One sweep is a forward scan that deletes every entry past its absolute
//! expiry. The periodic mode runs sweeps on a dedicated thread; the
//! on-demand mode runs the same pass synchronously from the cleanup command.

use crate::entry;
use crate::error::StoreError;
use crate::stats::SpillStats;
use crate::store::SpillStore;
use crate::types::now_ms;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sleep slice between stop-flag checks, keeping shutdown responsive.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SweepReport {
    /// Entries visited.
    pub scanned: u64,

    /// Entries deleted because their expiry had passed.
    pub cleaned: u64,
}

/// Run one full sweep over the store.
///
/// `stop` is sampled between cursor positions in periodic mode so teardown
/// is not held up by a long scan. Failed deletes are logged and not counted
/// as cleaned. Stats are updated even when the scan ends early or with an
/// error; the error is returned for command paths to surface.
pub(crate) fn sweep(
    store: &SpillStore,
    stats: &SpillStats,
    stop: Option<&AtomicBool>,
) -> (SweepReport, Option<StoreError>) {
    let now_ms = now_ms();
    let mut report = SweepReport::default();
    let mut scan_error = None;

    for item in store.scan() {
        if stop.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            break;
        }

        let (key, value) = match item {
            Ok(kv) => kv,
            Err(e) => {
                scan_error = Some(e);
                break;
            }
        };
        report.scanned += 1;

        let Some(expiry_ms) = entry::decode_expiry(&value) else {
            // Shorter than the header; leave it for the restore path to
            // report as corrupted.
            continue;
        };
        if expiry_ms > 0 && expiry_ms < now_ms {
            match store.delete(&key) {
                Ok(()) => {
                    report.cleaned += 1;
                    debug!(
                        key = %String::from_utf8_lossy(&key),
                        expiry_ms,
                        "expired entry swept"
                    );
                }
                Err(e) => {
                    warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "failed to delete expired entry"
                    );
                }
            }
        }
    }

    if let Some(e) = &scan_error {
        warn!(error = %e, "sweep scan error");
    }

    stats.record_sweep(report.cleaned);
    debug!(
        scanned = report.scanned,
        cleaned = report.cleaned,
        "sweep finished"
    );
    (report, scan_error)
}

/// Start the periodic sweeper thread.
pub(crate) fn spawn(
    store: Arc<SpillStore>,
    stats: Arc<SpillStats>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("spillover-sweeper".to_string())
        .spawn(move || run(&store, &stats, &stop, interval))
}

fn run(store: &SpillStore, stats: &SpillStats, stop: &AtomicBool, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "sweeper thread started");

    loop {
        let mut slept = Duration::ZERO;
        while slept < interval && !stop.load(Ordering::Relaxed) {
            thread::sleep(SLEEP_SLICE);
            slept += SLEEP_SLICE;
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }

        sweep(store, stats, Some(stop));
    }

    info!("sweeper thread stopped");
}
