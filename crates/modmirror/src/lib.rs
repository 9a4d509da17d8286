//! Continuous module mirror.
//!
//! Polls the module index, downloads every new release archive from the
//! module proxy and stores each file once by content hash, with a
//! `<module>/@v/<version>/<file>` namespace of hard links on top.

pub mod config;
pub mod crawler;
pub mod reporter;
pub mod scheduler;
pub mod shutdown;

pub use config::{Cli, Config, ConfigError};
pub use crawler::{CrawlSummary, Crawler};
pub use scheduler::{Completion, FetchScheduler};
