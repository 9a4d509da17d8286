pub mod atomic_write;
pub mod hardlink;
pub mod publish;

pub use atomic_write::{AtomicWriteOptions, atomic_read, atomic_write};
pub use hardlink::replace_hardlink;
pub use publish::{Publish, publish_exclusive};

use std::ffi::OsString;
use std::path::Path;

use crate::{Error, Result};

/// Hidden, collision-free sibling name used for staging a file next to `path`.
pub fn staging_name(path: &Path) -> OsString {
    let mut name = OsString::from(".tmp.");
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
        name.push(".");
    }
    name.push(uuid::Uuid::new_v4().simple().to_string());
    name
}

pub fn ensure_parent(path: &Path) -> Result<&Path> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::NoParent(path.to_path_buf()))?;
    std::fs::create_dir_all(parent).map_err(|e| Error::Write {
        path: parent.to_path_buf(),
        source: e,
    })?;
    Ok(parent)
}
