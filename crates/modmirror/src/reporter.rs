use std::sync::Arc;
use std::time::Duration;

use modmirror_counters::Counters;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Log a counter snapshot every `every` until shutdown.
pub async fn run(counters: Arc<Counters>, every: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;

    let mut last = counters.snapshot();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let now = counters.snapshot();
        let delta = now.since(&last);
        info!(
            modules = now.modules,
            gone = now.gone,
            failed = now.failed,
            uncompressed = now.bytes_uncompressed,
            compressed = now.bytes_compressed,
            deduped = now.bytes_deduped,
            new_modules = delta.modules,
            new_bytes_stored = delta.bytes_stored,
            "{now}"
        );
        last = now;
    }
}
