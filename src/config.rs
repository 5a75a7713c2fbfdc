//! Configuration module for UptimeX.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::aggregate::{
    AggregationConfig, DEFAULT_RECENT_SAMPLES, DEFAULT_WINDOW_COUNT, DEFAULT_WINDOW_SECS,
};
use crate::scheduler::DEFAULT_REFRESH_INTERVAL;

use chrono::Duration as ChronoDuration;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Longest timeline the window settings may describe (100 years).
const MAX_TIMELINE_SECS: u64 = 100 * 365 * 24 * 60 * 60;
/// Upper bound on the number of timeline windows.
const MAX_WINDOW_COUNT: usize = 10_000;

/// Configuration error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Where ticks are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Http {
        api_url: String,
        auth_token: Option<String>,
        timeout: Duration,
    },
    Sqlite {
        db_path: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port of the JSON server (default: 8080)
    pub http_port: u16,
    pub source: SourceConfig,
    pub aggregation: AggregationConfig,
    /// Time between refreshes (default: 60s)
    pub refresh_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            source: SourceConfig::Http {
                api_url: "http://localhost:5000".to_string(),
                auth_token: None,
                timeout: Duration::from_secs(10),
            },
            aggregation: AggregationConfig::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPTIMEX_HTTP_PORT`: JSON server port (default: 8080)
    /// - `UPTIMEX_API_URL`: ingestion API base URL (default: "http://localhost:5000")
    /// - `UPTIMEX_AUTH_TOKEN`: token sent in the Authorization header
    /// - `UPTIMEX_FETCH_TIMEOUT_SECS`: API request timeout (default: 10)
    /// - `UPTIMEX_DB_PATH`: read ticks from this SQLite file instead of the API
    /// - `UPTIMEX_WINDOW_SECS`: timeline window width (default: 180)
    /// - `UPTIMEX_WINDOW_COUNT`: number of timeline windows (default: 10)
    /// - `UPTIMEX_RECENT_SAMPLES`: ticks in the latency average (default: 10)
    /// - `UPTIMEX_REFRESH_SECS`: refresh interval (default: 60)
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, "UPTIMEX_HTTP_PORT")? {
            cfg.http_port = port;
        }

        cfg.source = match lookup("UPTIMEX_DB_PATH").filter(|p| !p.is_empty()) {
            Some(db_path) => SourceConfig::Sqlite { db_path },
            None => {
                let timeout = positive_secs(&lookup, "UPTIMEX_FETCH_TIMEOUT_SECS")?
                    .unwrap_or(Duration::from_secs(10));
                SourceConfig::Http {
                    api_url: lookup("UPTIMEX_API_URL")
                        .unwrap_or_else(|| "http://localhost:5000".to_string()),
                    auth_token: lookup("UPTIMEX_AUTH_TOKEN").filter(|t| !t.is_empty()),
                    timeout,
                }
            }
        };

        let window_width = positive_secs(&lookup, "UPTIMEX_WINDOW_SECS")?
            .unwrap_or(Duration::from_secs(DEFAULT_WINDOW_SECS.unsigned_abs()));
        let window_count = parse_var(&lookup, "UPTIMEX_WINDOW_COUNT")?.unwrap_or(DEFAULT_WINDOW_COUNT);
        cfg.aggregation = AggregationConfig {
            window_size: timeline_window(window_width, window_count)?,
            window_count,
            recent_sample_size: parse_var(&lookup, "UPTIMEX_RECENT_SAMPLES")?
                .unwrap_or(DEFAULT_RECENT_SAMPLES),
        };

        if let Some(interval) = positive_secs(&lookup, "UPTIMEX_REFRESH_SECS")? {
            cfg.refresh_interval = interval;
        }

        Ok(cfg)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };

    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(v) => Ok(Some(v)),
        Err(e) => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<F, u64>(lookup, key)? {
        Some(0) => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        other => Ok(other.map(Duration::from_secs)),
    }
}

/// Check that `count` windows of `width` fit in a sane timeline.
fn timeline_window(width: Duration, count: usize) -> Result<ChronoDuration, ConfigError> {
    if count > MAX_WINDOW_COUNT {
        return Err(ConfigError::Invalid {
            key: "UPTIMEX_WINDOW_COUNT".to_string(),
            value: count.to_string(),
            reason: format!("must be at most {}", MAX_WINDOW_COUNT),
        });
    }

    let secs = width.as_secs();
    let span = u64::try_from(count).ok().and_then(|c| secs.checked_mul(c));
    let too_long = |reason: String| ConfigError::Invalid {
        key: "UPTIMEX_WINDOW_SECS".to_string(),
        value: secs.to_string(),
        reason,
    };

    if secs > MAX_TIMELINE_SECS || span.map_or(true, |s| s > MAX_TIMELINE_SECS) {
        return Err(too_long(format!(
            "{} windows of this width exceed {}s",
            count, MAX_TIMELINE_SECS
        )));
    }

    ChronoDuration::from_std(width).map_err(|e| too_long(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(60));
        assert_eq!(cfg.aggregation.window_size, ChronoDuration::minutes(3));
        assert_eq!(cfg.aggregation.window_count, 10);
        assert_eq!(cfg.aggregation.recent_sample_size, 10);
    }

    #[test]
    fn test_empty_environment_matches_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        let default = Config::default();
        assert_eq!(cfg.source, default.source);
        assert_eq!(cfg.aggregation, default.aggregation);
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("UPTIMEX_HTTP_PORT", "9090"),
            ("UPTIMEX_API_URL", "https://api.example.com"),
            ("UPTIMEX_AUTH_TOKEN", "abc"),
            ("UPTIMEX_WINDOW_SECS", "60"),
            ("UPTIMEX_WINDOW_COUNT", "0"),
            ("UPTIMEX_RECENT_SAMPLES", " 5 "),
            ("UPTIMEX_REFRESH_SECS", "15"),
        ]))
        .unwrap();

        assert_eq!(cfg.http_port, 9090);
        assert_eq!(
            cfg.source,
            SourceConfig::Http {
                api_url: "https://api.example.com".to_string(),
                auth_token: Some("abc".to_string()),
                timeout: Duration::from_secs(10),
            }
        );
        assert_eq!(cfg.aggregation.window_size, ChronoDuration::seconds(60));
        assert_eq!(cfg.aggregation.window_count, 0);
        assert_eq!(cfg.aggregation.recent_sample_size, 5);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_db_path_selects_sqlite() {
        let cfg = Config::from_lookup(lookup(&[("UPTIMEX_DB_PATH", "ticks.db")])).unwrap();
        assert_eq!(
            cfg.source,
            SourceConfig::Sqlite {
                db_path: "ticks.db".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("UPTIMEX_HTTP_PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("UPTIMEX_WINDOW_SECS", "0")])).is_err());

        let err = Config::from_lookup(lookup(&[("UPTIMEX_REFRESH_SECS", "-1")])).unwrap_err();
        let ConfigError::Invalid { key, value, .. } = err;
        assert_eq!(key, "UPTIMEX_REFRESH_SECS");
        assert_eq!(value, "-1");
    }

    #[test]
    fn test_oversized_window_width_is_rejected() {
        for secs in ["18446744073709551615", "10000000000000000", "100000000000000"] {
            let err = Config::from_lookup(lookup(&[("UPTIMEX_WINDOW_SECS", secs)])).unwrap_err();
            let ConfigError::Invalid { key, .. } = err;
            assert_eq!(key, "UPTIMEX_WINDOW_SECS");
        }
    }

    #[test]
    fn test_timeline_span_is_bounded() {
        // One year per window is fine on its own but not ten thousand times over.
        let year = "31536000";
        assert!(Config::from_lookup(lookup(&[("UPTIMEX_WINDOW_SECS", year)])).is_ok());
        assert!(Config::from_lookup(lookup(&[
            ("UPTIMEX_WINDOW_SECS", year),
            ("UPTIMEX_WINDOW_COUNT", "10000"),
        ]))
        .is_err());

        let err = Config::from_lookup(lookup(&[("UPTIMEX_WINDOW_COUNT", "10001")])).unwrap_err();
        let ConfigError::Invalid { key, .. } = err;
        assert_eq!(key, "UPTIMEX_WINDOW_COUNT");
    }

    #[test]
    fn test_accepted_window_settings_build_a_valid_timeline() {
        let cfg = Config::from_lookup(lookup(&[
            ("UPTIMEX_WINDOW_SECS", "86400"),
            ("UPTIMEX_WINDOW_COUNT", "10000"),
        ]))
        .unwrap();

        let now = chrono::Utc::now();
        let windows = crate::aggregate::compute_windows(
            &[],
            now,
            cfg.aggregation.window_size,
            cfg.aggregation.window_count,
        );
        assert_eq!(windows.len(), 10_000);
        assert!(windows.iter().all(|w| w.start < w.end));
    }
}
