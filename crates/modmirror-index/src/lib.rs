//! Reading the module index feed.
//!
//! The feed is a time-ordered list of `{Path, Version, Timestamp}` records
//! served in pages: `GET <index>?since=<timestamp>` returns records at or
//! after `since`. This crate covers:
//!
//! - [`FeedDecoder`] - incremental decoding of a JSON array or
//!   newline-delimited body, chunk by chunk
//! - [`IndexPoller`] / [`FeedPage`] - one request per page, records yielded lazily
//! - [`ReadCursor`] - where the next page starts, skipping records the
//!   inclusive `since` would repeat
//! - [`Watermark`] - the highest timestamp safe to persist, given records that
//!   complete out of order
//! - [`Checkpoint`] - the persisted cursor file

mod checkpoint;
mod cursor;
mod decoder;
mod error;
mod poller;
mod record;

pub use checkpoint::Checkpoint;
pub use cursor::{ReadCursor, Watermark};
pub use decoder::FeedDecoder;
pub use error::{IndexError, Result};
pub use poller::{FeedPage, IndexPoller};
pub use record::IndexRecord;
