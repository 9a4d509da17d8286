use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read index body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("unexpected byte {byte:#04x} at offset {offset} between records")]
    Framing { offset: u64, byte: u8 },

    #[error("feed ended inside a record ({pending} bytes pending)")]
    Truncated { pending: usize },

    #[error("malformed record: {0}")]
    Json(#[source] serde_json::Error),

    #[error("decoder already failed; no further records")]
    Poisoned,

    #[error("invalid index URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to persist checkpoint {}: {source}", path.display())]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: modmirror_fs::Error,
    },
}

pub type Result<T> = std::result::Result<T, IndexError>;
