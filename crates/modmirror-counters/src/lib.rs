//! Ingestion tallies shared by every fetch worker.
//!
//! A single [`Counters`] value is created by the binary and handed to each
//! component behind an `Arc`. All tallies only ever grow; readers take a
//! [`Snapshot`] for reporting.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    /// Index records whose archive processing finished, whatever the outcome.
    modules: AtomicU64,
    /// Archives the proxy reported as permanently gone (HTTP 410).
    gone: AtomicU64,
    /// Archives that failed for any other reason.
    failed: AtomicU64,
    bytes_uncompressed: AtomicU64,
    bytes_compressed: AtomicU64,
    /// Bytes not written because an identical blob already existed.
    bytes_deduped: AtomicU64,
    /// Bytes written into newly created blobs.
    bytes_stored: AtomicU64,
    /// Namespace entries linked.
    files_stored: AtomicU64,
    /// Namespace entries whose blob already existed.
    files_deduped: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_module(&self) {
        self.modules.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gone(&self) {
        self.gone.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_member(&self, compressed: u64, uncompressed: u64) {
        self.bytes_compressed.fetch_add(compressed, Ordering::Relaxed);
        self.bytes_uncompressed
            .fetch_add(uncompressed, Ordering::Relaxed);
    }

    pub fn record_blob_created(&self, len: u64) {
        self.bytes_stored.fetch_add(len, Ordering::Relaxed);
    }

    pub fn record_blob_deduped(&self, len: u64) {
        self.bytes_deduped.fetch_add(len, Ordering::Relaxed);
        self.files_deduped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_linked(&self) {
        self.files_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            modules: self.modules.load(Ordering::Relaxed),
            gone: self.gone.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_uncompressed: self.bytes_uncompressed.load(Ordering::Relaxed),
            bytes_compressed: self.bytes_compressed.load(Ordering::Relaxed),
            bytes_deduped: self.bytes_deduped.load(Ordering::Relaxed),
            bytes_stored: self.bytes_stored.load(Ordering::Relaxed),
            files_stored: self.files_stored.load(Ordering::Relaxed),
            files_deduped: self.files_deduped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Counters`]. Fields are loaded one by one, so a
/// snapshot taken under load is not a consistent cut across tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub modules: u64,
    pub gone: u64,
    pub failed: u64,
    pub bytes_uncompressed: u64,
    pub bytes_compressed: u64,
    pub bytes_deduped: u64,
    pub bytes_stored: u64,
    pub files_stored: u64,
    pub files_deduped: u64,
}

impl Snapshot {
    /// Per-field difference against an earlier snapshot.
    pub fn since(&self, earlier: &Snapshot) -> Snapshot {
        Snapshot {
            modules: self.modules.saturating_sub(earlier.modules),
            gone: self.gone.saturating_sub(earlier.gone),
            failed: self.failed.saturating_sub(earlier.failed),
            bytes_uncompressed: self
                .bytes_uncompressed
                .saturating_sub(earlier.bytes_uncompressed),
            bytes_compressed: self
                .bytes_compressed
                .saturating_sub(earlier.bytes_compressed),
            bytes_deduped: self.bytes_deduped.saturating_sub(earlier.bytes_deduped),
            bytes_stored: self.bytes_stored.saturating_sub(earlier.bytes_stored),
            files_stored: self.files_stored.saturating_sub(earlier.files_stored),
            files_deduped: self.files_deduped.saturating_sub(earlier.files_deduped),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "modules={} err410={} errOther={} uncompressed={} compressed={} deduped={} stored={} files={} filesDeduped={}",
            self.modules,
            self.gone,
            self.failed,
            self.bytes_uncompressed,
            self.bytes_compressed,
            self.bytes_deduped,
            self.bytes_stored,
            self.files_stored,
            self.files_deduped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(Counters::new().snapshot(), Snapshot::default());
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counters = Arc::new(Counters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_module();
                        counters.record_member(3, 7);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = counters.snapshot();
        assert_eq!(snap.modules, 8000);
        assert_eq!(snap.bytes_compressed, 24_000);
        assert_eq!(snap.bytes_uncompressed, 56_000);
    }

    #[test]
    fn dedup_updates_bytes_and_files() {
        let counters = Counters::new();
        counters.record_blob_created(9);
        counters.record_blob_deduped(9);
        counters.record_blob_deduped(9);

        let snap = counters.snapshot();
        assert_eq!(snap.bytes_stored, 9);
        assert_eq!(snap.bytes_deduped, 18);
        assert_eq!(snap.files_deduped, 2);
    }

    #[test]
    fn snapshot_delta_and_display() {
        let counters = Counters::new();
        let before = counters.snapshot();
        counters.record_gone();
        counters.record_failed();
        let after = counters.snapshot();

        let delta = after.since(&before);
        assert_eq!(delta.gone, 1);
        assert_eq!(delta.failed, 1);
        assert!(after.to_string().contains("err410=1 errOther=1"));
    }
}
