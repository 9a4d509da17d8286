//! Reading module release archives.
//!
//! A release is served as a single zip whose members are named
//! `<module>@<version>/<file>`. [`ModuleZip`] opens the whole archive from
//! memory and hands out member headers and contents one index at a time, so
//! a damaged member can be skipped without abandoning the rest.
//!
//! ```
//! use std::io::{Cursor, Write};
//! use modmirror_archive::ModuleZip;
//! use zip::write::{SimpleFileOptions, ZipWriter};
//!
//! let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
//! writer.start_file("m1@v1/go.mod", SimpleFileOptions::default()).unwrap();
//! writer.write_all(b"module m1").unwrap();
//! let bytes = writer.finish().unwrap().into_inner();
//!
//! let mut archive = ModuleZip::new(bytes.into()).unwrap();
//! assert_eq!(archive.len(), 1);
//! assert_eq!(archive.header(0).unwrap().name, "m1@v1/go.mod");
//! assert_eq!(archive.read(0).unwrap(), b"module m1");
//! ```

pub use error::{ArchiveError, Result};
pub use member::MemberHeader;
pub use module_zip::ModuleZip;

mod error;
mod member;
mod module_zip;
