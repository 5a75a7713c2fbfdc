//! Wire format of the ingestion API and validation into [`Tick`]s.

use crate::models::{EndpointState, Tick, TickStatus};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// A tick that cannot be admitted into aggregation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedTick {
    #[error("tick {id}: invalid status {value:?}")]
    InvalidStatus { id: String, value: String },
    #[error("tick {id}: missing timestamp")]
    MissingTimestamp { id: String },
    #[error("tick {id}: invalid timestamp {value:?}")]
    InvalidTimestamp { id: String, value: String },
    #[error("tick {id}: invalid latency {value}")]
    InvalidLatency { id: String, value: f64 },
}

/// A tick as delivered by the API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTick {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub latency: Option<f64>,
}

/// An endpoint as delivered by the API.
///
/// `ticks` is `None` when the listing left the ticks out, which the bulk
/// website listing does.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireEndpoint {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub ticks: Option<Vec<WireTick>>,
}

/// Body of the bulk listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebsitesResponse {
    #[serde(default)]
    pub websites: Vec<WireEndpoint>,
}

impl TryFrom<WireTick> for Tick {
    type Error = MalformedTick;

    fn try_from(wire: WireTick) -> Result<Self, Self::Error> {
        let status = match wire.status.as_deref() {
            Some("Good") => TickStatus::Healthy,
            Some("Bad") => TickStatus::Unhealthy,
            other => {
                return Err(MalformedTick::InvalidStatus {
                    id: wire.id,
                    value: other.unwrap_or_default().to_string(),
                })
            }
        };

        let raw_time = match wire.created_at.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Err(MalformedTick::MissingTimestamp { id: wire.id }),
        };
        let occurred_at = match parse_timestamp(raw_time) {
            Some(t) => t,
            None => {
                return Err(MalformedTick::InvalidTimestamp {
                    value: raw_time.to_string(),
                    id: wire.id,
                })
            }
        };

        // A missing latency is recorded as zero.
        let latency_ms = wire.latency.unwrap_or(0.0);
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return Err(MalformedTick::InvalidLatency {
                id: wire.id,
                value: latency_ms,
            });
        }

        Ok(Tick {
            id: wire.id,
            occurred_at,
            status,
            latency_ms,
        })
    }
}

impl WireEndpoint {
    /// Validate every tick, skipping and logging the malformed ones.
    pub fn into_state(self) -> EndpointState {
        let endpoint_id = self.id;
        let wire_ticks = self.ticks.unwrap_or_default();
        let mut ticks = Vec::with_capacity(wire_ticks.len());

        for wire in wire_ticks {
            match Tick::try_from(wire) {
                Ok(tick) => ticks.push(tick),
                Err(e) => {
                    tracing::warn!("Skipping malformed tick for endpoint {}: {}", endpoint_id, e);
                }
            }
        }

        EndpointState {
            endpoint_id,
            url: self.url,
            ticks,
        }
    }
}

/// Parse an RFC 3339 or naive (UTC) timestamp.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wire(id: &str, created_at: Option<&str>, status: Option<&str>, latency: Option<f64>) -> WireTick {
        WireTick {
            id: id.to_string(),
            created_at: created_at.map(str::to_string),
            status: status.map(str::to_string),
            latency,
        }
    }

    #[test]
    fn test_valid_tick() {
        let tick = Tick::try_from(wire("1", Some("2024-01-01T12:00:00Z"), Some("Bad"), Some(42.0))).unwrap();
        assert_eq!(tick.status, TickStatus::Unhealthy);
        assert_eq!(tick.occurred_at, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        assert_eq!(tick.latency_ms, 42.0);
    }

    #[test]
    fn test_missing_latency_is_zero() {
        let tick = Tick::try_from(wire("1", Some("2024-01-01 12:00:00"), Some("Good"), None)).unwrap();
        assert_eq!(tick.latency_ms, 0.0);
    }

    #[test]
    fn test_rejects_unknown_status() {
        let err = Tick::try_from(wire("7", Some("2024-01-01T12:00:00Z"), Some("up"), Some(1.0))).unwrap_err();
        assert_eq!(
            err,
            MalformedTick::InvalidStatus {
                id: "7".to_string(),
                value: "up".to_string()
            }
        );

        let err = Tick::try_from(wire("8", Some("2024-01-01T12:00:00Z"), None, Some(1.0))).unwrap_err();
        assert!(matches!(err, MalformedTick::InvalidStatus { .. }));
    }

    #[test]
    fn test_rejects_bad_timestamps_and_latency() {
        let err = Tick::try_from(wire("1", None, Some("Good"), None)).unwrap_err();
        assert!(matches!(err, MalformedTick::MissingTimestamp { .. }));

        let err = Tick::try_from(wire("2", Some("yesterday"), Some("Good"), None)).unwrap_err();
        assert!(matches!(err, MalformedTick::InvalidTimestamp { .. }));

        let err = Tick::try_from(wire("3", Some("2024-01-01T12:00:00Z"), Some("Good"), Some(-5.0))).unwrap_err();
        assert!(matches!(err, MalformedTick::InvalidLatency { .. }));
    }

    #[test]
    fn test_into_state_skips_malformed_ticks() {
        let endpoint = WireEndpoint {
            id: "site".to_string(),
            url: "https://example.com".to_string(),
            ticks: Some(vec![
                wire("ok", Some("2024-01-01T12:00:00Z"), Some("Good"), Some(5.0)),
                wire("bad-status", Some("2024-01-01T12:00:01Z"), Some("Meh"), Some(5.0)),
                wire("no-time", None, Some("Bad"), Some(5.0)),
            ]),
        };

        let state = endpoint.into_state();
        assert_eq!(state.endpoint_id, "site");
        assert_eq!(state.ticks.len(), 1);
        assert_eq!(state.ticks[0].id, "ok");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let body = r#"{"websites":[{"id":"w1","url":"https://a.dev","ticks":[
            {"id":"t1","createdAt":"2024-01-01T00:00:00.000Z","status":"Good","latency":12}
        ]},{"id":"w2","url":"https://b.dev"}]}"#;

        let parsed: WebsitesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.websites.len(), 2);
        let ticks = parsed.websites[0].ticks.as_ref().unwrap();
        assert_eq!(ticks[0].latency, Some(12.0));
        assert!(parsed.websites[1].ticks.is_none());
        assert!(parsed.websites[1].clone().into_state().ticks.is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(parse_timestamp("2024-05-06T07:08:09Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06T09:08:09+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06 07:08:09"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06T07:08:09"), Some(expected));
        assert_eq!(parse_timestamp("not a time"), None);
    }
}
