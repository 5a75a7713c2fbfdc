//! HTTP request handlers.

use super::AppState;
use crate::view::{EndpointView, Overview, StatusFilter};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NOT_READY: &str = "No data yet";

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse<'a> {
    pub refreshed_at: DateTime<Utc>,
    pub overview: &'a Overview,
    pub endpoints: Vec<&'a EndpointView>,
}

pub async fn handle_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let filter: StatusFilter = match query.status.as_deref().unwrap_or("all").parse() {
        Ok(f) => f,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let latest = state.refresh.borrow().dashboard.clone();
    let dashboard = match latest {
        Some(d) => d,
        None => return (StatusCode::SERVICE_UNAVAILABLE, NOT_READY).into_response(),
    };

    let search = query.q.unwrap_or_default();
    let body = DashboardResponse {
        refreshed_at: dashboard.refreshed_at,
        overview: &dashboard.overview,
        endpoints: dashboard.filtered(&search, filter),
    };

    Json(body).into_response()
}

pub async fn handle_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let latest = state.refresh.borrow().dashboard.clone();
    let dashboard = match latest {
        Some(d) => d,
        None => return (StatusCode::SERVICE_UNAVAILABLE, NOT_READY).into_response(),
    };

    match dashboard.find(&id) {
        Some(view) => Json(view).into_response(),
        None => (StatusCode::NOT_FOUND, "Endpoint not found").into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshStatusResponse {
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
}

pub async fn handle_refresh_status(State(state): State<AppState>) -> impl IntoResponse {
    let refresh = state.refresh.borrow().clone();

    Json(RefreshStatusResponse {
        last_success: refresh.last_success,
        last_failure_at: refresh.last_failure.as_ref().map(|f| f.at),
        last_failure: refresh.last_failure.map(|f| f.error.to_string()),
    })
}
