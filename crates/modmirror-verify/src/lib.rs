//! Content digests for the content-addressed store.
//!
//! Blobs are keyed by the SHA-256 of their raw bytes.
//!
//! ```
//! use modmirror_verify::ContentDigest;
//!
//! let digest = ContentDigest::of(b"module m1");
//! assert_eq!(digest.to_hex().len(), 64);
//! assert_eq!(ContentDigest::from_hex(&digest.to_hex()).unwrap(), digest);
//! ```

pub use self::digest::ContentDigest;
pub use self::error::{Result, VerifyError};

mod digest;
mod error;
mod hasher;
