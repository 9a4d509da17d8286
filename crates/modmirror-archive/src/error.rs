use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive is corrupted: {source}")]
    Corrupted {
        #[source]
        source: zip::result::ZipError,
    },

    #[error("member #{index} is unreadable: {source}")]
    Member {
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("member '{name}' escapes the archive root")]
    UnsafeName { name: String },

    #[error("member '{name}' is a directory")]
    Directory { name: String },

    #[error("failed to read member '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
