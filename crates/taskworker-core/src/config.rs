//! WorkerConfig - 起動時に読む設定
//!
//! JSON から読めるように serde で定義し、省略されたフィールドは default を使う。
//!
//! ```json
//! { "concurrentTasksLimit": 4, "gracefulShutdown": true }
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("concurrentTasksLimit must be a positive integer or \"unbounded\", got {0}")]
    InvalidLimit(String),

    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Maximum number of tasks executing at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyLimit {
    Bounded(NonZeroUsize),
    Unbounded,
}

impl ConcurrencyLimit {
    pub const DEFAULT: usize = 10;

    /// Bounded limit; `None` for zero.
    pub fn bounded(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self::Bounded)
    }

    /// Whether `active` running tasks leave room for one more.
    pub fn has_room(&self, active: usize) -> bool {
        match self {
            Self::Bounded(limit) => active < limit.get(),
            Self::Unbounded => true,
        }
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self::Bounded(NonZeroUsize::new(Self::DEFAULT).unwrap_or(NonZeroUsize::MIN))
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(limit) => limit.fmt(f),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Count(u64),
    Keyword(String),
}

impl<'de> Deserialize<'de> for ConcurrencyLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let invalid =
            |s: String| <D::Error as serde::de::Error>::custom(ConfigError::InvalidLimit(s));
        match LimitRepr::deserialize(deserializer)? {
            LimitRepr::Count(n) => usize::try_from(n)
                .ok()
                .and_then(Self::bounded)
                .ok_or_else(|| invalid(n.to_string())),
            LimitRepr::Keyword(s) if s.eq_ignore_ascii_case("unbounded") => Ok(Self::Unbounded),
            LimitRepr::Keyword(s) => Err(invalid(format!("{s:?}"))),
        }
    }
}

impl Serialize for ConcurrencyLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bounded(limit) => serializer.serialize_u64(limit.get() as u64),
            Self::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

/// Worker configuration. Intervals are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    pub concurrent_tasks_limit: ConcurrencyLimit,

    /// Wait for in-flight tasks in `stop()`.
    pub graceful_shutdown: bool,

    pub recovery_interval_ms: u64,

    /// How often graceful `stop()` re-checks outstanding work.
    pub drain_poll_interval_ms: u64,

    /// Pause after a failed claim before trying again.
    pub claim_retry_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrent_tasks_limit: ConcurrencyLimit::default(),
            graceful_shutdown: false,
            recovery_interval_ms: 10_000,
            drain_poll_interval_ms: 1_000,
            claim_retry_backoff_ms: 1_000,
        }
    }
}

impl WorkerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("recoveryIntervalMs", self.recovery_interval_ms),
            ("drainPollIntervalMs", self.drain_poll_interval_ms),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { field });
            }
        }
        Ok(())
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_interval_ms)
    }

    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }

    pub fn claim_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.claim_retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_documented_values() {
        let config = WorkerConfig::default();
        assert_eq!(config.concurrent_tasks_limit, ConcurrencyLimit::bounded(10).unwrap());
        assert!(!config.graceful_shutdown);
        assert_eq!(config.recovery_interval(), Duration::from_secs(10));
        assert_eq!(config.drain_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config = WorkerConfig::from_json("{}").unwrap();
        assert_eq!(config, WorkerConfig::default());
    }

    #[rstest]
    #[case(r#"{"concurrentTasksLimit": 1}"#, ConcurrencyLimit::bounded(1).unwrap())]
    #[case(r#"{"concurrentTasksLimit": 25}"#, ConcurrencyLimit::bounded(25).unwrap())]
    #[case(r#"{"concurrentTasksLimit": "unbounded"}"#, ConcurrencyLimit::Unbounded)]
    fn parses_limit(#[case] json: &str, #[case] expected: ConcurrencyLimit) {
        let config = WorkerConfig::from_json(json).unwrap();
        assert_eq!(config.concurrent_tasks_limit, expected);
    }

    #[rstest]
    #[case(r#"{"concurrentTasksLimit": 0}"#)]
    #[case(r#"{"concurrentTasksLimit": "lots"}"#)]
    #[case(r#"{"recoveryIntervalMs": 0}"#)]
    fn rejects_invalid_values(#[case] json: &str) {
        assert!(WorkerConfig::from_json(json).is_err());
    }

    #[test]
    fn limit_room() {
        let two = ConcurrencyLimit::bounded(2).unwrap();
        assert!(two.has_room(1));
        assert!(!two.has_room(2));
        assert!(ConcurrencyLimit::Unbounded.has_room(usize::MAX));
    }
}
