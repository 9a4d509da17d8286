use std::path::{Path, PathBuf};
use std::sync::Arc;

use modmirror_counters::Counters;
use modmirror_fs::Publish;
use modmirror_verify::ContentDigest;
use tracing::trace;

use crate::error::{Result, StoreError};
use crate::logical::LogicalPath;

pub const CONTENT_DIR: &str = "content";
pub const MOD_DIR: &str = "mod";
pub const TMP_DIR: &str = "tmp";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlobStatus {
    Created,
    Deduplicated,
}

/// Result of a successful [`ContentStore::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stored {
    pub digest: ContentDigest,
    pub status: BlobStatus,
    pub len: u64,
}

pub struct ContentStore {
    content_root: PathBuf,
    mod_root: PathBuf,
    staging_root: PathBuf,
    counters: Arc<Counters>,
}

impl ContentStore {
    /// Open (creating if needed) the store rooted at `base`.
    pub fn open(base: impl AsRef<Path>, counters: Arc<Counters>) -> Result<Self> {
        let base = base.as_ref();
        let store = Self {
            content_root: base.join(CONTENT_DIR),
            mod_root: base.join(MOD_DIR),
            staging_root: base.join(TMP_DIR),
            counters,
        };
        for dir in [&store.content_root, &store.mod_root, &store.staging_root] {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(store)
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn mod_root(&self) -> &Path {
        &self.mod_root
    }

    /// `content/ab/cd/abcd...`: two levels of fan-out keep directories small.
    pub fn blob_path(&self, digest: &ContentDigest) -> PathBuf {
        let hex = digest.to_hex();
        self.content_root.join(&hex[0..2]).join(&hex[2..4]).join(hex)
    }

    pub fn entry_path(&self, logical: &LogicalPath) -> PathBuf {
        self.mod_root.join(logical.as_path())
    }

    /// Store `bytes` once by digest and link `logical` to that blob.
    ///
    /// The blob is kept even when linking fails; another entry may still
    /// reference it and it is never rewritten.
    pub fn add(&self, logical: &LogicalPath, bytes: &[u8]) -> Result<Stored> {
        let digest = ContentDigest::of(bytes);
        let blob = self.blob_path(&digest);
        let len = bytes.len() as u64;

        let status = match modmirror_fs::publish_exclusive(&blob, bytes, &self.staging_root) {
            Ok(Publish::Created) => {
                self.counters.record_blob_created(len);
                BlobStatus::Created
            }
            Ok(Publish::AlreadyExists) => {
                self.counters.record_blob_deduped(len);
                BlobStatus::Deduplicated
            }
            Err(source) => {
                return Err(StoreError::Blob {
                    digest: digest.to_hex(),
                    source,
                });
            }
        };

        let entry = self.entry_path(logical);
        modmirror_fs::replace_hardlink(&blob, &entry)
            .map_err(|source| StoreError::Link { entry, source })?;
        self.counters.record_file_linked();

        trace!(%logical, %digest, ?status, len, "stored file");
        Ok(Stored {
            digest,
            status,
            len,
        })
    }

    /// Read the bytes behind a namespace entry.
    pub fn read(&self, logical: &LogicalPath) -> Result<Vec<u8>> {
        let entry = self.entry_path(logical);
        modmirror_fs::atomic_read(&entry).map_err(|source| StoreError::Read { entry, source })
    }

    /// Digests of every blob currently in the store.
    pub fn blob_digests(&self) -> Result<Vec<ContentDigest>> {
        let mut digests = Vec::new();
        for first in read_dirs(&self.content_root)? {
            for second in read_dirs(&first)? {
                let entries = std::fs::read_dir(&second).map_err(|source| StoreError::Io {
                    path: second.clone(),
                    source,
                })?;
                for entry in entries {
                    let entry = entry.map_err(|source| StoreError::Io {
                        path: second.clone(),
                        source,
                    })?;
                    let name = entry.file_name();
                    if let Some(digest) = name
                        .to_str()
                        .and_then(|n| ContentDigest::from_hex(n).ok())
                    {
                        digests.push(digest);
                    }
                }
            }
        }
        digests.sort();
        Ok(digests)
    }
}

fn read_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store(dir: &Path) -> ContentStore {
        ContentStore::open(dir, Arc::new(Counters::new())).unwrap()
    }

    #[test]
    fn open_creates_layout() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(store.content_root().is_dir());
        assert!(store.mod_root().is_dir());
        assert!(dir.path().join(TMP_DIR).is_dir());
    }

    #[test]
    fn blob_path_fans_out_by_digest_prefix() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let digest = ContentDigest::of(b"module m1");
        let hex = digest.to_hex();

        let expected = dir
            .path()
            .join(CONTENT_DIR)
            .join(&hex[..2])
            .join(&hex[2..4])
            .join(&hex);
        assert_eq!(store.blob_path(&digest), expected);
    }

    #[test]
    fn add_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let logical = LogicalPath::for_member("m1", "v1", "m1@v1/go.mod").unwrap();

        let stored = store.add(&logical, b"module m1").unwrap();
        assert_eq!(stored.status, BlobStatus::Created);
        assert_eq!(store.read(&logical).unwrap(), b"module m1");
        assert_eq!(store.blob_digests().unwrap(), vec![stored.digest]);
    }

    #[test]
    fn readding_same_path_links_new_content() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let logical = LogicalPath::for_member("m1", "v1", "m1@v1/README").unwrap();

        store.add(&logical, b"first").unwrap();
        store.add(&logical, b"second").unwrap();

        assert_eq!(store.read(&logical).unwrap(), b"second");
        assert_eq!(store.blob_digests().unwrap().len(), 2);
    }

    #[test]
    fn link_failure_keeps_blob() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let blocker = LogicalPath::for_member("m1", "v1", "m1@v1/dir").unwrap();
        let nested = LogicalPath::for_member("m1", "v1", "m1@v1/dir/file").unwrap();

        store.add(&blocker, b"a file where a directory is needed").unwrap();
        let err = store.add(&nested, b"nested").unwrap_err();

        assert!(matches!(err, StoreError::Link { .. }));
        assert!(store.blob_path(&ContentDigest::of(b"nested")).is_file());
        assert_eq!(store.counters().snapshot().files_stored, 1);
    }
}
