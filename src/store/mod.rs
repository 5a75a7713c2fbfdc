//! Tick store adapters.
//!
//! The aggregation core only needs to fetch ticks; these adapters read them
//! from the ingestion API over HTTP or from a local SQLite database.

mod http;
mod sqlite;
mod wire;

pub use http::*;
pub use sqlite::*;
pub use wire::*;

use crate::models::EndpointState;

use async_trait::async_trait;
use thiserror::Error;

/// Failure fetching from the external store. Never fatal to a refresh loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("authentication failed")]
    Unauthorized,
    #[error("endpoint not found: {0}")]
    NotFound(String),
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("database error: {0}")]
    Database(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IngestError::Timeout
        } else if err.is_decode() {
            IngestError::Parse(err.to_string())
        } else {
            IngestError::Http(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => IngestError::NotFound(err.to_string()),
            other => IngestError::Database(other.to_string()),
        }
    }
}

/// Read-only access to endpoints and their tick histories.
///
/// Ticks may come back in any order; aggregation sorts them.
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Fetch one endpoint with all of its ticks.
    async fn fetch_endpoint_ticks(&self, endpoint_id: &str) -> Result<EndpointState, IngestError>;

    /// Fetch every active endpoint with its ticks.
    async fn fetch_all_endpoints(&self) -> Result<Vec<EndpointState>, IngestError>;

    /// Short label for logs.
    fn description(&self) -> String;
}
