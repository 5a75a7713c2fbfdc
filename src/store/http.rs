//! HTTP adapter for the ingestion API.

use super::{IngestError, TickSource, WebsitesResponse, WireEndpoint};
use crate::models::EndpointState;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Reads endpoints and ticks from the ingestion API.
#[derive(Clone)]
pub struct HttpTickSource {
    base_url: String,
    auth_token: Option<String>,
    client: Client,
}

impl HttpTickSource {
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IngestError> {
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Http(e.to_string()))?;

        Ok(Self {
            base_url,
            auth_token,
            client,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, IngestError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.auth_token {
            // The API expects the bare token, not a bearer scheme.
            request = request.header(reqwest::header::AUTHORIZATION, token.as_str());
        }

        let response = request.send().await?;
        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IngestError::Unauthorized),
            StatusCode::NOT_FOUND => Err(IngestError::NotFound(path.to_string())),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(IngestError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl TickSource for HttpTickSource {
    async fn fetch_endpoint_ticks(&self, endpoint_id: &str) -> Result<EndpointState, IngestError> {
        let response = self
            .get("/api/v1/website/status", &[("websiteId", endpoint_id)])
            .await?;

        // The API answers `null` for an endpoint it does not know.
        let endpoint: Option<WireEndpoint> = response.json().await?;
        endpoint
            .map(WireEndpoint::into_state)
            .ok_or_else(|| IngestError::NotFound(endpoint_id.to_string()))
    }

    async fn fetch_all_endpoints(&self) -> Result<Vec<EndpointState>, IngestError> {
        let response = self.get("/api/v1/websites", &[]).await?;
        let body: WebsitesResponse = response.json().await?;

        let mut endpoints = Vec::with_capacity(body.websites.len());
        for website in body.websites {
            if website.ticks.is_some() {
                endpoints.push(website.into_state());
                continue;
            }

            // The listing carries no ticks; read them from the status route.
            match self.fetch_endpoint_ticks(&website.id).await {
                Ok(state) => endpoints.push(state),
                Err(IngestError::NotFound(_)) => {
                    tracing::warn!("Endpoint {} disappeared during refresh", website.id);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(endpoints)
    }

    fn description(&self) -> String {
        format!("http: {}", self.base_url)
    }
}
