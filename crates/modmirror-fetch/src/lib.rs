//! Fetching module release archives from a module proxy.
//!
//! # Architecture
//!
//! - [`HttpClient`] - minimal streaming GET abstraction, with
//!   [`ReqwestClient`] as the production implementation
//! - [`ArchiveFetcher`] - downloads one `module@version` zip, classifies the
//!   response and stores every member through the content store
//! - `mock` (feature `mock`) - scripted in-process client for tests
//!
//! The fetcher never retries. Each call settles into exactly one
//! [`FetchOutcome`] and updates the shared counters accordingly.

mod error;
mod fetcher;
mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{FetchError, Result};
pub use fetcher::{ArchiveFetcher, FetchOutcome, UnpackReport, archive_url};
pub use http::{BoxStream, HttpClient, HttpResponse};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
