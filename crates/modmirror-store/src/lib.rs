//! Deduplicated, content-addressed file store.
//!
//! # Layout
//!
//! ```text
//! <base>/content/<hex[0..2]>/<hex[2..4]>/<sha256 hex>   immutable blobs
//! <base>/mod/<module>/@v/<version>/<file>               hard links into content/
//! <base>/tmp/                                           staging for blob publication
//! ```
//!
//! A blob is created at most once: publication uses an exclusive link, so
//! concurrent writers of identical bytes agree on a single winner and every
//! other writer records a dedup hit. Namespace entries are swapped in with a
//! rename and are never observed missing during a replace.

mod error;
mod logical;
mod store;

pub use error::{Result, StoreError};
pub use logical::{LogicalPath, escape_module_path};
pub use store::{BlobStatus, CONTENT_DIR, ContentStore, MOD_DIR, Stored, TMP_DIR};
