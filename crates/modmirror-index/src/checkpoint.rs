use std::path::{Path, PathBuf};

use modmirror_fs::AtomicWriteOptions;
use tracing::warn;

use crate::error::{IndexError, Result};

/// The persisted feed cursor: a single opaque timestamp in one file.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved cursor, or an empty string to start from the beginning of
    /// the feed. Unreadable content is logged and treated as absent.
    pub fn load(&self) -> String {
        match std::fs::read(&self.path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(cursor) => cursor.trim().to_string(),
                Err(_) => {
                    warn!(
                        path = %self.path.display(),
                        "checkpoint is not UTF-8; starting from the beginning"
                    );
                    String::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "checkpoint unreadable; starting from the beginning"
                );
                String::new()
            }
        }
    }

    /// Atomically replace the saved cursor.
    pub fn save(&self, cursor: &str) -> Result<()> {
        let options = AtomicWriteOptions::new().sync(true);
        modmirror_fs::atomic_write(&self.path, cursor.as_bytes(), options).map_err(|source| {
            IndexError::Checkpoint {
                path: self.path.clone(),
                source,
            }
        })
    }
}
