use crate::primitives::{ensure_parent, staging_name};
use crate::{Error, Result};
use std::path::Path;

fn is_cross_device(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18) || e.kind() == std::io::ErrorKind::CrossesDevices
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_inode(_: &Path, _: &Path) -> bool {
    false
}

/// Point `dest` at the inode behind `src`, replacing any existing entry.
///
/// The link is created under a staging name in the destination directory and
/// renamed over `dest`, so `dest` is never observed missing. If `dest`
/// already links the same inode nothing is touched.
pub fn replace_hardlink(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();
    if same_inode(src, dest) {
        return Ok(());
    }
    let parent = ensure_parent(dest)?;
    let tmp_link = parent.join(staging_name(dest));

    std::fs::hard_link(src, &tmp_link).map_err(|e| {
        if is_cross_device(&e) {
            Error::CrossDeviceHardlink {
                src: src.to_path_buf(),
                dest: dest.to_path_buf(),
            }
        } else {
            Error::Link {
                src: src.to_path_buf(),
                dest: tmp_link.clone(),
                source: e,
            }
        }
    })?;

    let renamed = std::fs::rename(&tmp_link, dest);
    // rename between two links of one inode succeeds without removing the source
    if tmp_link.symlink_metadata().is_ok() {
        let _ = std::fs::remove_file(&tmp_link);
    }
    renamed.map_err(|e| Error::Link {
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
        source: e,
    })
}
