use crate::dialect::Dialect;
use crate::valuer::Creator;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for a [`Db`](crate::Db) that can be loaded from a config file.
///
/// Durations are written in milliseconds:
///
/// ```json
/// { "dialect": "sqlite", "creator": "offset", "query_timeout_ms": 2000 }
/// ```
///
/// Every field is optional; missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub dialect: Dialect,
    pub creator: Creator,
    /// Per-statement timeout. `None` means no timeout (default).
    #[serde(rename = "query_timeout_ms", with = "duration_ms")]
    pub query_timeout: Option<Duration>,
    /// Enables statistics with slow-query warnings above this duration.
    #[serde(rename = "slow_query_threshold_ms", with = "duration_ms")]
    pub slow_query_threshold: Option<Duration>,
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creator = creator;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
