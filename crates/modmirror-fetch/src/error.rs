//! Error types for modmirror-fetch.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid module or version: {0}")]
    InvalidRecord(#[source] modmirror_store::StoreError),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("malformed archive from {url}: {source}")]
    Archive {
        url: String,
        #[source]
        source: modmirror_archive::ArchiveError,
    },

    #[error("unpack task for {url} did not finish: {source}")]
    Unpack {
        url: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("fetch task for {module}@{version} aborted: {source}")]
    Aborted {
        module: String,
        version: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] BoxError),
}

impl FetchError {
    pub(crate) fn transport(url: &str, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn body(url: &str, source: impl Into<BoxError>) -> Self {
        Self::Body {
            url: url.to_string(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
