use serde::{Deserialize, Serialize};

/// One published `module@version`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Version")]
    pub version: String,
    /// Opaque, non-decreasing along the feed.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

impl IndexRecord {
    pub fn new(
        path: impl Into<String>,
        version: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            timestamp: timestamp.into(),
        }
    }
}

impl std::fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}
