use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use modmirror_fetch::{ArchiveFetcher, HttpClient};
use modmirror_index::{Checkpoint, IndexPoller, ReadCursor, Watermark};
use modmirror_store::ContentStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::scheduler::{Completion, FetchScheduler};

/// How a crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// The cursor on disk when the crawl stopped.
    pub cursor: String,
    /// Records dispatched or consumed but not finished.
    pub abandoned: usize,
}

#[derive(Debug, Default)]
struct PageStats {
    yielded: usize,
    fresh: usize,
}

/// The coordinating loop: reads index pages, dispatches fetches and
/// persists the cursor as fetches finish.
pub struct Crawler<C> {
    poller: IndexPoller<C>,
    scheduler: FetchScheduler<C>,
    checkpoint: Checkpoint,
    cursor: ReadCursor,
    watermark: Watermark,
    persisted: String,
    shutdown: CancellationToken,
    interval: Duration,
    page_size: usize,
    shutdown_timeout: Duration,
}

impl<C: HttpClient> Crawler<C> {
    pub fn new(
        config: &Config,
        client: Arc<C>,
        store: Arc<ContentStore>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let poller = IndexPoller::new(Arc::clone(&client), &config.index_url)
            .context("invalid index URL")?;
        let fetcher = ArchiveFetcher::new(client, store, config.proxy_url.clone());
        let scheduler = FetchScheduler::new(fetcher, config.limit, shutdown.clone());

        let checkpoint = Checkpoint::new(config.checkpoint_path());
        let since = checkpoint.load();
        info!(cursor = %since, path = %checkpoint.path().display(), "resuming from checkpoint");

        Ok(Self {
            poller,
            scheduler,
            checkpoint,
            cursor: ReadCursor::new(since.clone()),
            watermark: Watermark::new(since.clone()),
            persisted: since,
            shutdown,
            interval: config.interval,
            page_size: config.page_size,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Crawl until shutdown, then drain in-flight fetches.
    pub async fn run(mut self) -> CrawlSummary {
        while !self.shutdown.is_cancelled() {
            let stats = self.poll_page().await;
            self.reap();
            if self.shutdown.is_cancelled() {
                break;
            }
            if stats.yielded < self.page_size || stats.fresh == 0 {
                debug!(yielded = stats.yielded, fresh = stats.fresh, "caught up; waiting");
                self.idle(self.interval).await;
            }
        }
        self.drain().await
    }

    /// Read one page and dispatch every record not seen before.
    async fn poll_page(&mut self) -> PageStats {
        let mut stats = PageStats::default();
        let since = self.cursor.since().to_string();

        let opened = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return stats,
            opened = self.poller.open_page(&since) => opened,
        };
        let mut page = match opened {
            Ok(page) => page,
            Err(e) => {
                warn!(cursor = %since, error = %e, "index request failed");
                return stats;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = page.next() => next,
            };
            let record = match next {
                None => break,
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    warn!(url = page.url(), error = %e, "index page ended early");
                    break;
                }
            };
            if !self.cursor.observe(&record) {
                continue;
            }
            stats.fresh += 1;

            let seq = self.watermark.begin(record.timestamp.clone());
            if !self.scheduler.dispatch(seq, record).await {
                self.watermark.abandon(seq);
                break;
            }
            self.reap();
        }

        stats.yielded = page.yielded();
        debug!(
            yielded = stats.yielded,
            fresh = stats.fresh,
            cursor = self.cursor.since(),
            "index page done"
        );
        stats
    }

    /// Sleep for `period`, settling completions as they arrive.
    async fn idle(&mut self, period: Duration) {
        let sleep = tokio::time::sleep(period);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                _ = &mut sleep => return,
                Some(completion) = self.scheduler.next_completed() => self.settle(completion),
            }
        }
    }

    fn reap(&mut self) {
        while let Some(completion) = self.scheduler.try_completed() {
            self.settle(completion);
        }
    }

    fn settle(&mut self, completion: Completion) {
        if !completion.outcome.is_settled() {
            debug!(record = %completion.record, "fetch abandoned");
            self.watermark.abandon(completion.seq);
            return;
        }
        if let Some(cursor) = self.watermark.complete(completion.seq) {
            let cursor = cursor.to_string();
            self.persist(&cursor);
        }
    }

    fn persist(&mut self, cursor: &str) {
        match self.checkpoint.save(cursor) {
            Ok(()) => self.persisted = cursor.to_string(),
            Err(e) => error!(cursor, error = %e, "failed to save checkpoint"),
        }
    }

    async fn drain(mut self) -> CrawlSummary {
        let in_flight = self.scheduler.in_flight();
        if in_flight > 0 {
            info!(in_flight, "waiting for in-flight fetches");
        }
        for completion in self.scheduler.drain(self.shutdown_timeout).await {
            self.settle(completion);
        }

        let committed = self.watermark.committed().to_string();
        if committed != self.persisted {
            self.persist(&committed);
        }

        let abandoned = self.watermark.abandoned();
        if abandoned > 0 {
            warn!(
                abandoned,
                cursor = %self.persisted,
                "fetches abandoned; they resume from the checkpoint"
            );
        }
        CrawlSummary {
            cursor: self.persisted,
            abandoned,
        }
    }
}
