use crate::primitives::staging_name;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Replace the contents of `path` with `content` in a single rename.
///
/// The parent directory must already exist.
pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let parent = path
        .parent()
        .ok_or_else(|| Error::NoParent(path.to_path_buf()))?;
    let tmp_path = parent.join(staging_name(path));

    let write = |tmp: &Path| -> std::io::Result<()> {
        let mut file = fs::File::create(tmp)?;
        file.write_all(content)?;
        if options.sync {
            file.sync_all()?;
        }
        Ok(())
    };

    if let Err(e) = write(&tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Write {
            path: tmp_path,
            source: e,
        });
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress");
        atomic_write(&path, b"2019-04-10T19:08:52.997264Z", AtomicWriteOptions::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"2019-04-10T19:08:52.997264Z");
    }

    #[test]
    fn test_atomic_write_overwrites_and_leaves_no_staging_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress");
        atomic_write(&path, b"first", AtomicWriteOptions::new()).unwrap();
        atomic_write(&path, b"second", AtomicWriteOptions::new().sync(true)).unwrap();

        assert_eq!(atomic_read(&path).unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("progress")]);
    }

    #[test]
    fn test_atomic_read_missing() {
        let dir = tempdir().unwrap();
        let err = atomic_read(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
