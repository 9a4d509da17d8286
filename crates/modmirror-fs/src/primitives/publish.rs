use crate::primitives::{ensure_parent, staging_name};
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Publish {
    /// This call wrote the file.
    Created,
    /// Another writer got there first; nothing was written.
    AlreadyExists,
}

/// Create `dest` holding `content` unless it already exists.
///
/// The bytes are staged in `staging_dir` and published with `link(2)`, which
/// fails if `dest` exists. Concurrent callers racing on the same `dest` get
/// exactly one `Created`, and `dest` never holds a partial write.
/// `staging_dir` must be on the same filesystem as `dest`.
pub fn publish_exclusive(
    dest: impl AsRef<Path>,
    content: &[u8],
    staging_dir: impl AsRef<Path>,
) -> Result<Publish> {
    let dest = dest.as_ref();
    let staging_dir = staging_dir.as_ref();

    if dest.exists() {
        return Ok(Publish::AlreadyExists);
    }

    ensure_parent(dest)?;
    fs::create_dir_all(staging_dir).map_err(|e| Error::Write {
        path: staging_dir.to_path_buf(),
        source: e,
    })?;

    let tmp_path = staging_dir.join(staging_name(dest));
    let staged = (|| -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_data()
    })();
    if let Err(e) = staged {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Write {
            path: tmp_path,
            source: e,
        });
    }

    let linked = fs::hard_link(&tmp_path, dest);
    let _ = fs::remove_file(&tmp_path);
    match linked {
        Ok(()) => Ok(Publish::Created),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(Publish::AlreadyExists),
        Err(e) => Err(Error::Link {
            src: tmp_path,
            dest: dest.to_path_buf(),
            source: e,
        }),
    }
}
