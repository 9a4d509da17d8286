use std::io::{Cursor, Read};

use bytes::Bytes;
use zip::ZipArchive;

use crate::error::{ArchiveError, Result};
use crate::member::MemberHeader;

/// Upper bound on the up-front allocation for one member; larger members
/// grow the buffer as they decompress.
const MAX_PREALLOC: u64 = 1 << 20;

/// A fully downloaded release archive.
pub struct ModuleZip {
    archive: ZipArchive<Cursor<Bytes>>,
}

impl ModuleZip {
    /// Parse the central directory. Fails when `bytes` is not a zip.
    pub fn new(bytes: Bytes) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|source| ArchiveError::Corrupted { source })?;
        Ok(Self { archive })
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Name and sizes of member `index`, read from the raw entry so a bad
    /// compression stream does not hide its metadata.
    pub fn header(&mut self, index: usize) -> Result<MemberHeader> {
        let file = self
            .archive
            .by_index_raw(index)
            .map_err(|source| ArchiveError::Member { index, source })?;
        Ok(MemberHeader {
            index,
            name: file.name().to_string(),
            compressed_size: file.compressed_size(),
            size: file.size(),
            is_dir: file.is_dir(),
            enclosed: file.enclosed_name().is_some(),
        })
    }

    /// Decompress member `index` into memory.
    pub fn read(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_index(index)
            .map_err(|source| ArchiveError::Member { index, source })?;
        let name = file.name().to_string();
        if file.enclosed_name().is_none() {
            return Err(ArchiveError::UnsafeName { name });
        }
        if file.is_dir() {
            return Err(ArchiveError::Directory { name });
        }

        let mut contents = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut contents)
            .map_err(|source| ArchiveError::Read { name, source })?;
        Ok(contents)
    }
}
