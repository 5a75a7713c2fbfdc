//! Read-only JSON surface over the latest refresh.

mod handlers;

pub use handlers::*;

use crate::scheduler::RefreshState;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub refresh: watch::Receiver<RefreshState>,
}

/// Web server exposing the dashboard projection.
pub struct Server {
    port: u16,
    state: AppState,
}

impl Server {
    pub fn new(port: u16, refresh: watch::Receiver<RefreshState>) -> Self {
        Self {
            port,
            state: AppState { refresh },
        }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/api/dashboard", get(handlers::handle_dashboard))
            .route("/api/endpoints/{id}", get(handlers::handle_endpoint))
            .route("/api/refresh", get(handlers::handle_refresh_status))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until the listener fails.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
