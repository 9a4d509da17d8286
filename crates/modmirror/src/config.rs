use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_INDEX_URL: &str = "https://index.golang.org/index";
pub const DEFAULT_PROXY_URL: &str = "https://proxy.golang.org";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration '{input}': {reason}")]
    Duration { input: String, reason: &'static str },

    #[error("--{0} must be greater than zero")]
    Zero(&'static str),
}

/// Parse `500ms`, `30s`, `1m` or `2h`. A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason| ConfigError::Duration {
        input: input.to_string(),
        reason,
    };
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(invalid("expected a number"));
    }
    let value: u64 = digits.parse().map_err(|_| invalid("number out of range"))?;
    let millis_per_unit = match unit {
        "ms" => 1,
        "" | "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        _ => return Err(invalid("unknown unit, expected ms, s, m or h")),
    };
    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| invalid("number out of range"))
}

#[derive(Parser, Debug)]
#[command(name = "modmirror")]
#[command(version, long_about = None)]
#[command(about = "Mirror every published module release into a deduplicated store")]
pub struct Cli {
    /// Datastore directory
    #[arg(long, env = "MODMIRROR_DIR", default_value = "/data")]
    pub dir: PathBuf,

    /// Wait between index polls once caught up
    #[arg(long, default_value = "1m", value_parser = parse_duration)]
    pub interval: Duration,

    /// Maximum concurrent archive downloads
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Index feed URL
    #[arg(long, env = "MODMIRROR_INDEX_URL", default_value = DEFAULT_INDEX_URL)]
    pub index_url: String,

    /// Module proxy base URL
    #[arg(long, env = "MODMIRROR_PROXY_URL", default_value = DEFAULT_PROXY_URL)]
    pub proxy_url: String,

    /// A page with fewer records than this means the feed is caught up
    #[arg(long, default_value_t = 2000)]
    pub page_size: usize,

    /// How often counters are logged
    #[arg(long, default_value = "1m", value_parser = parse_duration)]
    pub report_interval: Duration,

    /// Grace period for in-flight downloads at shutdown
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub shutdown_timeout: Duration,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

/// Validated runtime configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub dir: PathBuf,
    pub interval: Duration,
    pub limit: usize,
    pub index_url: String,
    pub proxy_url: String,
    pub page_size: usize,
    pub report_interval: Duration,
    pub shutdown_timeout: Duration,
    pub log_json: bool,
}

impl Config {
    /// Defaults for everything but the datastore directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            interval: Duration::from_secs(60),
            limit: 10,
            index_url: DEFAULT_INDEX_URL.to_string(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            page_size: 2000,
            report_interval: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(30),
            log_json: false,
        }
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.join("progress")
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::Zero("limit"));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Zero("page-size"));
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::Zero("report-interval"));
        }
        Ok(self)
    }
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        Config {
            dir: cli.dir,
            interval: cli.interval,
            limit: cli.limit,
            index_url: cli.index_url,
            proxy_url: cli.proxy_url,
            page_size: cli.page_size,
            report_interval: cli.report_interval,
            shutdown_timeout: cli.shutdown_timeout,
            log_json: cli.log_json,
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("15").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("5 days").is_err());
        assert!(parse_duration("1.5m").is_err());
        assert!(parse_duration("99999999999999999999s").is_err());
    }

    #[test]
    fn cli_defaults() {
        let config = Config::try_from(Cli::try_parse_from(["modmirror"]).unwrap()).unwrap();
        assert_eq!(config.dir, PathBuf::from("/data"));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.limit, 10);
        assert_eq!(config.page_size, 2000);
        assert_eq!(config.index_url, DEFAULT_INDEX_URL);
        assert_eq!(config.proxy_url, DEFAULT_PROXY_URL);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(!config.log_json);
        assert_eq!(config.checkpoint_path(), PathBuf::from("/data/progress"));
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::try_parse_from([
            "modmirror",
            "--dir",
            "/srv/mirror",
            "--interval",
            "10s",
            "--limit",
            "32",
            "--log-json",
        ])
        .unwrap();
        let config = Config::try_from(cli).unwrap();
        assert_eq!(config.dir, PathBuf::from("/srv/mirror"));
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.limit, 32);
        assert!(config.log_json);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let cli = Cli::try_parse_from(["modmirror", "--limit", "0"]).unwrap();
        assert_eq!(Config::try_from(cli).unwrap_err(), ConfigError::Zero("limit"));
        assert!(Cli::try_parse_from(["modmirror", "--interval", "soon"]).is_err());
    }
}
