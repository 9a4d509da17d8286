use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to link {src} -> {dest}: {source}")]
    Link {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cross-device hardlink not supported: {src} -> {dest}")]
    CrossDeviceHardlink { src: PathBuf, dest: PathBuf },

    #[error("path has no parent directory: {0}")]
    NoParent(PathBuf),
}

impl Error {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Error::Read { path, .. } | Error::Write { path, .. } | Error::NoParent(path) => path,
            Error::Link { dest, .. } | Error::CrossDeviceHardlink { dest, .. } => dest,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
