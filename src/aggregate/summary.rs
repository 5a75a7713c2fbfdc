//! Whole-history status statistics for an endpoint.

use super::{chronological, mean_latency};
use crate::models::{EndpointStatus, StatusSummary, Tick, TickStatus};

use chrono::{DateTime, Utc};

/// Derive current status, recent latency and uptime from a tick history.
///
/// Current status only looks at the latest tick, so it can disagree with
/// the latest window when that window also holds earlier failures.
pub fn summarize(ticks: &[Tick], now: DateTime<Utc>, recent_sample_size: usize) -> StatusSummary {
    let sorted = chronological(ticks);
    let latest = sorted.last();

    let current_status = match latest.map(|t| t.status) {
        Some(TickStatus::Healthy) => EndpointStatus::Up,
        Some(TickStatus::Unhealthy) => EndpointStatus::Down,
        None => EndpointStatus::Unknown,
    };

    let recent = &sorted[sorted.len().saturating_sub(recent_sample_size)..];
    let healthy = sorted.iter().filter(|t| t.is_healthy()).count();
    let uptime_ratio = if sorted.is_empty() {
        0.0
    } else {
        healthy as f64 / sorted.len() as f64
    };

    StatusSummary {
        current_status,
        average_latency_ms: mean_latency(recent.iter().copied()),
        uptime_ratio,
        last_checked_at: latest.map(|t| t.occurred_at).unwrap_or(now),
    }
}
