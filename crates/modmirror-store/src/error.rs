use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid module path '{path}': {reason}")]
    InvalidModulePath { path: String, reason: &'static str },

    #[error("invalid archive member '{member}': {reason}")]
    InvalidMember { member: String, reason: &'static str },

    #[error("failed to store blob {digest}: {source}")]
    Blob {
        digest: String,
        #[source]
        source: modmirror_fs::Error,
    },

    #[error("failed to link {entry}: {source}")]
    Link {
        entry: PathBuf,
        #[source]
        source: modmirror_fs::Error,
    },

    #[error("failed to read {entry}: {source}")]
    Read {
        entry: PathBuf,
        #[source]
        source: modmirror_fs::Error,
    },

    #[error("store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
