//! Watcher configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the SignalWatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// How long the master may hold a long-poll open, in seconds
    #[serde(rename = "longpoll-timeout-secs", default = "default_longpoll_timeout_secs")]
    pub longpoll_timeout_secs: u64,

    /// Extra client-side time on top of the server-side wait, in seconds
    #[serde(rename = "request-margin-secs", default = "default_request_margin_secs")]
    pub request_margin_secs: u64,

    /// Delay before retrying after a non-timeout failure, in milliseconds
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_longpoll_timeout_secs() -> u64 {
    60
}

fn default_request_margin_secs() -> u64 {
    10
}

fn default_retry_delay_ms() -> u64 {
    10_000
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            longpoll_timeout_secs: 60,
            request_margin_secs: 10,
            retry_delay_ms: 10_000,
        }
    }
}

impl WatcherConfig {
    /// Client-side timeout for a poll that asks the master to wait `wait_secs`
    pub fn request_timeout(&self, wait_secs: u64) -> Duration {
        Duration::from_secs(wait_secs + self.request_margin_secs)
    }

    /// Get the retry delay as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatcherConfig::default();
        assert_eq!(config.longpoll_timeout_secs, 60);
        assert_eq!(config.request_margin_secs, 10);
        assert_eq!(config.retry_delay_ms, 10_000);
    }

    #[test]
    fn test_request_timeout_exceeds_wait() {
        let config = WatcherConfig::default();
        assert_eq!(config.request_timeout(0), Duration::from_secs(10));
        assert_eq!(config.request_timeout(60), Duration::from_secs(70));
    }

    #[test]
    fn test_retry_delay_duration() {
        let config = WatcherConfig {
            retry_delay_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: WatcherConfig = serde_yaml::from_str("longpoll-timeout-secs: 30").unwrap();
        assert_eq!(config.longpoll_timeout_secs, 30);
        assert_eq!(config.request_margin_secs, 10);
        assert_eq!(config.retry_delay_ms, 10_000);
    }
}
