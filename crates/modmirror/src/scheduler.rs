use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use modmirror_fetch::{ArchiveFetcher, FetchError, FetchOutcome, HttpClient};
use modmirror_index::IndexRecord;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// A dispatched record that has finished, successfully or not.
#[derive(Debug)]
pub struct Completion {
    pub seq: u64,
    pub record: IndexRecord,
    pub outcome: FetchOutcome,
}

/// Runs at most `limit` fetches at once.
///
/// `dispatch` waits for a free slot, so a full scheduler pushes back on the
/// index reader. Completions are collected by the caller in whatever order
/// the fetches finish.
pub struct FetchScheduler<C> {
    fetcher: ArchiveFetcher<C>,
    slots: Arc<Semaphore>,
    tasks: JoinSet<FetchOutcome>,
    dispatched: HashMap<task::Id, (u64, IndexRecord)>,
    shutdown: CancellationToken,
    /// Interrupts downloads still running once the drain deadline passes.
    abort: CancellationToken,
}

impl<C: HttpClient> FetchScheduler<C> {
    pub fn new(fetcher: ArchiveFetcher<C>, limit: usize, shutdown: CancellationToken) -> Self {
        Self {
            fetcher,
            slots: Arc::new(Semaphore::new(limit)),
            tasks: JoinSet::new(),
            dispatched: HashMap::new(),
            shutdown,
            abort: CancellationToken::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Start fetching `record` once a slot frees up.
    ///
    /// Returns false without dispatching if shutdown is requested first.
    pub async fn dispatch(&mut self, seq: u64, record: IndexRecord) -> bool {
        let permit = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        let fetcher = self.fetcher.clone();
        let abort = self.abort.clone();
        let (module, version) = (record.path.clone(), record.version.clone());
        let handle = self.tasks.spawn(async move {
            let _permit = permit;
            fetcher.fetch(&module, &version, &abort).await
        });
        self.dispatched.insert(handle.id(), (seq, record));
        true
    }

    /// A finished fetch, if one is ready, without waiting.
    pub fn try_completed(&mut self) -> Option<Completion> {
        let joined = self.tasks.try_join_next_with_id()?;
        Some(self.complete(joined))
    }

    /// Wait for the next fetch to finish. `None` when nothing is in flight.
    pub async fn next_completed(&mut self) -> Option<Completion> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(self.complete(joined))
    }

    /// Stop admitting work and collect every in-flight fetch.
    ///
    /// Fetches get `grace` to finish on their own; after that their downloads
    /// are cancelled and they complete as [`FetchOutcome::Cancelled`].
    pub async fn drain(&mut self, grace: Duration) -> Vec<Completion> {
        self.slots.close();
        let mut completions = Vec::new();

        let deadline = tokio::time::sleep(grace);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                next = self.next_completed() => match next {
                    Some(completion) => completions.push(completion),
                    None => return completions,
                },
                _ = &mut deadline => break,
            }
        }

        warn!(
            in_flight = self.tasks.len(),
            grace_ms = grace.as_millis() as u64,
            "shutdown grace period elapsed; cancelling in-flight fetches"
        );
        self.abort.cancel();
        while let Some(completion) = self.next_completed().await {
            completions.push(completion);
        }
        completions
    }

    fn complete(&mut self, joined: Result<(task::Id, FetchOutcome), JoinError>) -> Completion {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, Ok(outcome)),
            Err(e) => (e.id(), Err(e)),
        };
        // Every spawned task is registered before it can be joined.
        let (seq, record) = self
            .dispatched
            .remove(&id)
            .unwrap_or_else(|| (u64::MAX, IndexRecord::new("", "", "")));

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => FetchOutcome::Cancelled,
            Err(source) => {
                let counters = self.fetcher.counters();
                counters.record_module();
                counters.record_failed();
                error!(
                    module = %record.path,
                    version = %record.version,
                    error = %source,
                    "fetch task panicked"
                );
                FetchOutcome::Failed(FetchError::Aborted {
                    module: record.path.clone(),
                    version: record.version.clone(),
                    source,
                })
            }
        };
        Completion {
            seq,
            record,
            outcome,
        }
    }
}
