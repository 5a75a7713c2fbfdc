//! Tick-to-status aggregation.
//!
//! Both computations here are pure: the same ticks and the same `now`
//! always give the same result, and no input is ever mutated.

mod summary;
mod window;

pub use summary::*;
pub use window::*;

use crate::models::{EndpointSummary, Tick};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Default width of a timeline window (3 minutes).
pub const DEFAULT_WINDOW_SECS: i64 = 180;
/// Default number of timeline windows (30 minutes of history).
pub const DEFAULT_WINDOW_COUNT: usize = 10;
/// Default number of recent ticks used for the latency average.
pub const DEFAULT_RECENT_SAMPLES: usize = 10;

/// Parameters of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationConfig {
    pub window_size: ChronoDuration,
    pub window_count: usize,
    pub recent_sample_size: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            window_size: ChronoDuration::seconds(DEFAULT_WINDOW_SECS),
            window_count: DEFAULT_WINDOW_COUNT,
            recent_sample_size: DEFAULT_RECENT_SAMPLES,
        }
    }
}

/// Summarize an endpoint's history and attach its window timeline.
pub fn aggregate_endpoint(
    ticks: &[Tick],
    now: DateTime<Utc>,
    config: &AggregationConfig,
) -> EndpointSummary {
    EndpointSummary {
        status: summarize(ticks, now, config.recent_sample_size),
        windows: compute_windows(ticks, now, config.window_size, config.window_count),
    }
}

/// Sort ticks chronologically without touching the caller's slice.
///
/// The sort is stable, so ticks sharing a timestamp keep their delivery order.
pub(crate) fn chronological(ticks: &[Tick]) -> Vec<&Tick> {
    let mut sorted: Vec<&Tick> = ticks.iter().collect();
    sorted.sort_by_key(|t| t.occurred_at);
    sorted
}

/// Mean latency of the given ticks, or 0 when there are none.
pub(crate) fn mean_latency<'a>(ticks: impl IntoIterator<Item = &'a Tick>) -> f64 {
    let (sum, count) = ticks
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), t| (sum + t.latency_ms, count + 1));

    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}
