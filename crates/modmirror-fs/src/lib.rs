//! Atomic filesystem primitives used by the mirror's checkpoint and content store.
//!
//! Every mutation that a concurrent reader could observe goes through a staging
//! name followed by a single `rename` or `link` syscall, so readers see either
//! the old state or the new one.

mod error;
pub mod primitives;

pub use error::{Error, Result};
pub use primitives::{
    AtomicWriteOptions, Publish, atomic_read, atomic_write, ensure_parent, publish_exclusive,
    replace_hardlink, staging_name,
};
