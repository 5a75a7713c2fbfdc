//! Core data types for ticks and their derived aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickStatus {
    Healthy,
    Unhealthy,
}

/// One recorded health-check result for an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub status: TickStatus,
    /// Latency in milliseconds. A missing measurement is stored as 0.
    pub latency_ms: f64,
}

impl Tick {
    pub fn new(
        id: impl Into<String>,
        occurred_at: DateTime<Utc>,
        status: TickStatus,
        latency_ms: f64,
    ) -> Self {
        Self {
            id: id.into(),
            occurred_at,
            status,
            latency_ms,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == TickStatus::Healthy
    }
}

/// Resolved status of a time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStatus {
    Up,
    Down,
    NoData,
}

/// A fixed-duration bucket over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: WindowStatus,
    pub average_latency_ms: f64,
    pub sample_count: usize,
}

/// Current status of an endpoint, taken from its latest tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Up,
    Down,
    Unknown,
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndpointStatus::Up => "up",
            EndpointStatus::Down => "down",
            EndpointStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Status statistics derived from a full tick history, without windowing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub current_status: EndpointStatus,
    /// Mean latency over the most recent samples.
    pub average_latency_ms: f64,
    /// Fraction of healthy ticks over the whole history, in `[0, 1]`.
    pub uptime_ratio: f64,
    pub last_checked_at: DateTime<Utc>,
}

/// Per-endpoint derived view: status statistics plus the recent timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    #[serde(flatten)]
    pub status: StatusSummary,
    pub windows: Vec<Window>,
}

/// A monitored endpoint together with its fetched tick history.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointState {
    pub endpoint_id: String,
    pub url: String,
    /// Ticks in whatever order the source delivered them.
    pub ticks: Vec<Tick>,
}
