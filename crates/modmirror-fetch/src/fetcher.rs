use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use modmirror_archive::ModuleZip;
use modmirror_counters::Counters;
use modmirror_store::{ContentStore, LogicalPath, escape_module_path};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};
use crate::http::HttpClient;

/// `<proxy>/<escaped module>/@v/<escaped version>.zip`
pub fn archive_url(proxy: &str, module: &str, version: &str) -> Result<String> {
    let module = escape_module_path(module).map_err(FetchError::InvalidRecord)?;
    let version = escape_module_path(version).map_err(FetchError::InvalidRecord)?;
    Ok(format!(
        "{}/{module}/@v/{version}.zip",
        proxy.trim_end_matches('/')
    ))
}

/// What happened to the members of one archive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnpackReport {
    pub members: usize,
    pub files_stored: usize,
    pub files_skipped: usize,
    pub bytes: u64,
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// 200: the archive was opened and its members stored.
    Stored(UnpackReport),
    /// 410: the release is permanently unavailable.
    Gone,
    /// Any other failure. Already logged and counted.
    Failed(FetchError),
    /// The download was interrupted by shutdown. Nothing was counted.
    Cancelled,
}

impl FetchOutcome {
    /// Whether the record is finished for this session. Cancelled records
    /// must be fetched again after a restart.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

enum Download {
    Archive(Bytes),
    Gone,
}

/// Downloads release archives and stores their members.
pub struct ArchiveFetcher<C> {
    client: Arc<C>,
    store: Arc<ContentStore>,
    proxy_url: String,
}

impl<C> Clone for ArchiveFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            proxy_url: self.proxy_url.clone(),
        }
    }
}

impl<C: HttpClient> ArchiveFetcher<C> {
    pub fn new(client: Arc<C>, store: Arc<ContentStore>, proxy_url: impl Into<String>) -> Self {
        Self {
            client,
            store,
            proxy_url: proxy_url.into(),
        }
    }

    pub fn counters(&self) -> &Arc<Counters> {
        self.store.counters()
    }

    /// Fetch and unpack `module@version`.
    ///
    /// `cancel` interrupts the download only; once the archive is in memory
    /// its members are stored to completion.
    pub async fn fetch(
        &self,
        module: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let url = match archive_url(&self.proxy_url, module, version) {
            Ok(url) => url,
            Err(e) => return self.settle(module, version, Err(e)),
        };

        let download = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(module, version, "fetch cancelled");
                return FetchOutcome::Cancelled;
            }
            download = self.download(&url) => download,
        };

        let result = match download {
            Ok(Download::Gone) => Ok(None),
            Ok(Download::Archive(bytes)) => {
                self.unpack(&url, module, version, bytes).await.map(Some)
            }
            Err(e) => Err(e),
        };
        self.settle(module, version, result)
    }

    async fn download(&self, url: &str) -> Result<Download> {
        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        match response.status {
            200 => {}
            410 => return Ok(Download::Gone),
            status => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                });
            }
        }

        let mut body = response.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FetchError::body(url, e))?;
            buf.extend_from_slice(&chunk);
        }
        Ok(Download::Archive(buf.freeze()))
    }

    async fn unpack(
        &self,
        url: &str,
        module: &str,
        version: &str,
        bytes: Bytes,
    ) -> Result<UnpackReport> {
        let store = Arc::clone(&self.store);
        let (module, version) = (module.to_string(), version.to_string());
        let task =
            tokio::task::spawn_blocking(move || unpack_archive(&store, &module, &version, bytes));
        match task.await {
            Ok(result) => result.map_err(|source| FetchError::Archive {
                url: url.to_string(),
                source,
            }),
            Err(source) => Err(FetchError::Unpack {
                url: url.to_string(),
                source,
            }),
        }
    }

    fn settle(
        &self,
        module: &str,
        version: &str,
        result: Result<Option<UnpackReport>>,
    ) -> FetchOutcome {
        let counters = self.counters();
        counters.record_module();
        match result {
            Ok(Some(report)) => {
                debug!(
                    module,
                    version,
                    stored = report.files_stored,
                    skipped = report.files_skipped,
                    bytes = report.bytes,
                    "archive stored"
                );
                FetchOutcome::Stored(report)
            }
            Ok(None) => {
                counters.record_gone();
                debug!(module, version, "archive gone");
                FetchOutcome::Gone
            }
            Err(e) => {
                counters.record_failed();
                warn!(module, version, error = %e, "fetch failed");
                FetchOutcome::Failed(e)
            }
        }
    }
}

/// Store every file member of `bytes`, in archive order.
///
/// Per-member failures are logged and skipped; only an unreadable central
/// directory fails the whole archive.
fn unpack_archive(
    store: &ContentStore,
    module: &str,
    version: &str,
    bytes: Bytes,
) -> modmirror_archive::Result<UnpackReport> {
    let counters = store.counters();
    let mut archive = ModuleZip::new(bytes)?;
    let mut report = UnpackReport {
        members: archive.len(),
        ..UnpackReport::default()
    };

    for index in 0..archive.len() {
        let header = match archive.header(index) {
            Ok(header) => header,
            Err(e) => {
                warn!(module, version, index, error = %e, "skipping unreadable member");
                report.files_skipped += 1;
                continue;
            }
        };
        counters.record_member(header.compressed_size, header.size);
        if header.is_dir {
            continue;
        }

        let logical = match LogicalPath::for_member(module, version, &header.name) {
            Ok(logical) => logical,
            Err(e) => {
                skip_member(&mut report, module, version, &header.name, &e);
                continue;
            }
        };
        let contents = match archive.read(index) {
            Ok(contents) => contents,
            Err(e) => {
                skip_member(&mut report, module, version, &header.name, &e);
                continue;
            }
        };
        match store.add(&logical, &contents) {
            Ok(stored) => {
                report.files_stored += 1;
                report.bytes += stored.len;
            }
            Err(e) => skip_member(&mut report, module, version, &header.name, &e),
        }
    }

    if report.files_skipped > 0 {
        info!(
            module,
            version,
            skipped = report.files_skipped,
            total = report.members,
            "archive stored with skipped members"
        );
    }
    Ok(report)
}

fn skip_member(
    report: &mut UnpackReport,
    module: &str,
    version: &str,
    member: &str,
    error: &dyn std::error::Error,
) {
    warn!(module, version, member, error = %error, "skipping member");
    report.files_skipped += 1;
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::time::Duration;

    use modmirror_verify::ContentDigest;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    use super::*;
    use crate::mock::{MockHttpClient, MockReply};

    const PROXY: &str = "http://proxy.test";

    fn module_zip(members: &[(&str, &[u8])]) -> Bytes {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner().into()
    }

    fn setup() -> (TempDir, Arc<MockHttpClient>, ArchiveFetcher<MockHttpClient>) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path(), Arc::new(Counters::new())).unwrap();
        let client = Arc::new(MockHttpClient::new());
        let fetcher = ArchiveFetcher::new(Arc::clone(&client), Arc::new(store), PROXY);
        (dir, client, fetcher)
    }

    #[test]
    fn url_escapes_case() {
        assert_eq!(
            archive_url("https://proxy.golang.org/", "github.com/BurntSushi/toml", "v1.0.0")
                .unwrap(),
            "https://proxy.golang.org/github.com/!burnt!sushi/toml/@v/v1.0.0.zip"
        );
        assert!(archive_url(PROXY, "", "v1").is_err());
    }

    #[tokio::test]
    async fn stores_members_of_a_200() {
        let (dir, client, fetcher) = setup();
        client.reply(
            format!("{PROXY}/m1/@v/v1.zip"),
            MockReply::chunked(module_zip(&[("m1@v1/go.mod", b"module m1")]), 7),
        );

        let outcome = fetcher.fetch("m1", "v1", &CancellationToken::new()).await;
        let FetchOutcome::Stored(report) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(report.files_stored, 1);
        assert_eq!(report.bytes, 9);

        let entry = dir.path().join("mod/m1/@v/v1/go.mod");
        assert_eq!(std::fs::read(entry).unwrap(), b"module m1");
        let blob_hex = ContentDigest::of(b"module m1").to_hex();
        let blob = dir
            .path()
            .join("content")
            .join(&blob_hex[..2])
            .join(&blob_hex[2..4])
            .join(&blob_hex);
        assert!(blob.exists());

        let snap = fetcher.counters().snapshot();
        assert_eq!(snap.modules, 1);
        assert_eq!(snap.failed, 0);
        assert_eq!(snap.bytes_uncompressed, 9);
    }

    #[tokio::test]
    async fn gone_is_counted_separately() {
        let (dir, client, fetcher) = setup();
        client.reply(format!("{PROXY}/m/@v/v1.zip"), MockReply::status(410));

        let outcome = fetcher.fetch("m", "v1", &CancellationToken::new()).await;
        assert!(matches!(outcome, FetchOutcome::Gone));
        let snap = fetcher.counters().snapshot();
        assert_eq!((snap.modules, snap.gone, snap.failed), (1, 1, 0));
        assert_eq!(std::fs::read_dir(dir.path().join("mod")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let (_dir, client, fetcher) = setup();
        client
            .reply(format!("{PROXY}/a/@v/v1.zip"), MockReply::status(500))
            .reply(format!("{PROXY}/b/@v/v1.zip"), MockReply::Transport("reset".into()))
            .reply(format!("{PROXY}/c/@v/v1.zip"), MockReply::ok("not a zip"))
            .reply(
                format!("{PROXY}/d/@v/v1.zip"),
                MockReply::BrokenBody {
                    chunks: vec![Bytes::from_static(b"PK")],
                    error: "truncated".into(),
                },
            );

        let cancel = CancellationToken::new();
        assert!(matches!(
            fetcher.fetch("a", "v1", &cancel).await,
            FetchOutcome::Failed(FetchError::Status { status: 500, .. })
        ));
        assert!(matches!(
            fetcher.fetch("b", "v1", &cancel).await,
            FetchOutcome::Failed(FetchError::Transport { .. })
        ));
        assert!(matches!(
            fetcher.fetch("c", "v1", &cancel).await,
            FetchOutcome::Failed(FetchError::Archive { .. })
        ));
        assert!(matches!(
            fetcher.fetch("d", "v1", &cancel).await,
            FetchOutcome::Failed(FetchError::Body { .. })
        ));
        assert!(matches!(
            fetcher.fetch("bad!path", "v1", &cancel).await,
            FetchOutcome::Failed(FetchError::InvalidRecord(_))
        ));

        let snap = fetcher.counters().snapshot();
        assert_eq!((snap.modules, snap.gone, snap.failed), (5, 0, 5));
    }

    #[tokio::test]
    async fn bad_member_is_skipped() {
        let (dir, client, fetcher) = setup();
        let archive = module_zip(&[("m@v1/../../escape", b"x"), ("m@v1/ok.go", b"package ok")]);
        client.reply(format!("{PROXY}/m/@v/v1.zip"), MockReply::ok(archive));

        let outcome = fetcher.fetch("m", "v1", &CancellationToken::new()).await;
        let FetchOutcome::Stored(report) = outcome else {
            panic!("archive should be stored");
        };
        assert_eq!(report.members, 2);
        assert_eq!(report.files_stored, 1);
        assert_eq!(report.files_skipped, 1);
        assert!(dir.path().join("mod/m/@v/v1/ok.go").exists());
        assert_eq!(fetcher.counters().snapshot().failed, 0);
    }

    #[tokio::test]
    async fn cancel_interrupts_download_without_counting() {
        let (_dir, client, fetcher) = setup();
        client.reply(format!("{PROXY}/slow/@v/v1.zip"), MockReply::Pending);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = fetcher.fetch("slow", "v1", &cancel).await;
        assert!(matches!(outcome, FetchOutcome::Cancelled));
        assert!(!outcome.is_settled());
        assert_eq!(fetcher.counters().snapshot().modules, 0);
    }
}
