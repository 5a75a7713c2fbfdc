//! Display-ready projection of aggregated endpoint data.
//!
//! Nothing here aggregates ticks; it only reshapes and rounds what the
//! aggregation produced, and filters the result.

use crate::aggregate::{aggregate_endpoint, AggregationConfig};
use crate::models::{EndpointState, EndpointStatus, EndpointSummary, Window, WindowStatus};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

const TIME_LABEL_FORMAT: &str = "%H:%M";

/// One timeline window as shown to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowView {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: WindowStatus,
    pub latency_ms: u64,
    pub checks: usize,
    pub label: String,
}

impl From<&Window> for WindowView {
    fn from(w: &Window) -> Self {
        Self {
            start: w.start,
            end: w.end,
            status: w.status,
            latency_ms: round_ms(w.average_latency_ms),
            checks: w.sample_count,
            label: format!(
                "{} - {}",
                w.start.format(TIME_LABEL_FORMAT),
                w.end.format(TIME_LABEL_FORMAT)
            ),
        }
    }
}

/// One endpoint as shown to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointView {
    pub id: String,
    pub name: String,
    pub url: String,
    pub status: EndpointStatus,
    pub response_time_ms: u64,
    /// Uptime over the whole history, in percent with one decimal.
    pub uptime_percent: f64,
    pub last_checked_at: DateTime<Utc>,
    pub last_checked_label: String,
    pub windows: Vec<WindowView>,
    /// Number of timeline windows that are down.
    pub incident_count: usize,
    /// Share of timeline windows that are up, in percent with one decimal.
    pub window_uptime_percent: f64,
}

impl EndpointView {
    pub fn new(endpoint_id: &str, url: &str, summary: &EndpointSummary) -> Self {
        let status = &summary.status;
        let windows: Vec<WindowView> = summary.windows.iter().map(WindowView::from).collect();

        let incident_count = windows
            .iter()
            .filter(|w| w.status == WindowStatus::Down)
            .count();
        let up_windows = windows.iter().filter(|w| w.status == WindowStatus::Up).count();
        let window_uptime_percent = if windows.is_empty() {
            0.0
        } else {
            round_percent(up_windows as f64 / windows.len() as f64)
        };

        Self {
            id: endpoint_id.to_string(),
            name: display_name(url),
            url: url.to_string(),
            status: status.current_status,
            response_time_ms: round_ms(status.average_latency_ms),
            uptime_percent: round_percent(status.uptime_ratio),
            last_checked_at: status.last_checked_at,
            last_checked_label: status.last_checked_at.format(TIME_LABEL_FORMAT).to_string(),
            windows,
            incident_count,
            window_uptime_percent,
        }
    }

    /// Case-insensitive substring match against name and URL.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query) || self.url.to_lowercase().contains(&query)
    }
}

/// Short display name: the URL without its scheme, up to the first `/`.
pub fn display_name(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    let rest = if lower.starts_with("https://") {
        &url[8..]
    } else if lower.starts_with("http://") {
        &url[7..]
    } else {
        url
    };

    rest.split('/').next().unwrap_or_default().to_string()
}

fn round_ms(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        ms.round() as u64
    } else {
        0
    }
}

fn round_percent(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 10.0
}

/// Status filter for the endpoint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EndpointStatus),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown status filter: {0}")]
pub struct UnknownStatusFilter(pub String);

impl FromStr for StatusFilter {
    type Err = UnknownStatusFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "up" => Ok(StatusFilter::Only(EndpointStatus::Up)),
            "down" => Ok(StatusFilter::Only(EndpointStatus::Down)),
            "unknown" => Ok(StatusFilter::Only(EndpointStatus::Unknown)),
            _ => Err(UnknownStatusFilter(s.to_string())),
        }
    }
}

impl StatusFilter {
    pub fn accepts(&self, status: EndpointStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

/// Keep the views matching both the search text and the status filter.
pub fn filter_views<'a>(
    views: &'a [EndpointView],
    query: &str,
    filter: StatusFilter,
) -> Vec<&'a EndpointView> {
    views
        .iter()
        .filter(|v| v.matches_search(query) && filter.accepts(v.status))
        .collect()
}

/// Fleet-wide counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    /// Down as soon as any endpoint is down.
    pub overall_status: EndpointStatus,
}

impl Overview {
    pub fn from_views(views: &[EndpointView]) -> Self {
        let up = views.iter().filter(|v| v.status == EndpointStatus::Up).count();
        let down = views.iter().filter(|v| v.status == EndpointStatus::Down).count();

        Self {
            total: views.len(),
            up,
            down,
            overall_status: if down == 0 {
                EndpointStatus::Up
            } else {
                EndpointStatus::Down
            },
        }
    }
}

/// Everything a rendering layer needs from one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub refreshed_at: DateTime<Utc>,
    pub overview: Overview,
    pub endpoints: Vec<EndpointView>,
}

impl Dashboard {
    /// Aggregate every endpoint of a snapshot against the same `now`.
    pub fn build(states: &[EndpointState], config: &AggregationConfig, now: DateTime<Utc>) -> Self {
        let endpoints: Vec<EndpointView> = states
            .iter()
            .map(|state| {
                let summary = aggregate_endpoint(&state.ticks, now, config);
                tracing::debug!(
                    "Aggregated {}: {} ticks, status {}",
                    state.endpoint_id,
                    state.ticks.len(),
                    summary.status.current_status
                );
                EndpointView::new(&state.endpoint_id, &state.url, &summary)
            })
            .collect();

        Self {
            refreshed_at: now,
            overview: Overview::from_views(&endpoints),
            endpoints,
        }
    }

    pub fn find(&self, endpoint_id: &str) -> Option<&EndpointView> {
        self.endpoints.iter().find(|e| e.id == endpoint_id)
    }

    pub fn filtered(&self, query: &str, filter: StatusFilter) -> Vec<&EndpointView> {
        filter_views(&self.endpoints, query, filter)
    }
}
