//! UptimeX - endpoint availability aggregation.
//!
//! Turns recorded health-check ticks into per-endpoint status, uptime,
//! latency and a fixed-size timeline of recent windows, refreshed on a timer.

pub mod aggregate;
pub mod config;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod view;
pub mod web;

pub use aggregate::{aggregate_endpoint, compute_windows, summarize, AggregationConfig};
pub use models::*;
pub use scheduler::{RefreshHandle, RefreshScheduler, RefreshState};
pub use store::{HttpTickSource, IngestError, SqliteTickStore, TickSource};
pub use view::{Dashboard, EndpointView, StatusFilter};
