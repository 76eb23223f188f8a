//! HTTP client for the route planner API.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use vfr_core::{PlannedRoute, RouteRequest};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Blocking client for a running `vfr-server`.
pub struct PlannerClient {
    client: Client,
    base_url: String,
}

impl PlannerClient {
    /// # Arguments
    /// * `base_url` - Server root, e.g. "http://localhost:8000"
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Ask the server to plan `request`.
    ///
    /// Server-side rejections (unknown airport, invalid request) come back as
    /// errors carrying the server's message.
    pub fn plan_route(&self, request: &RouteRequest) -> Result<PlannedRoute> {
        let url = format!("{}/route", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .with_context(|| format!("POST {}", url))?;

        let status = response.status();
        let body = response.text().context("reading route response")?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|err| err.error)
                .unwrap_or(body);
            return Err(anyhow!("server returned {}: {}", status, message));
        }
        serde_json::from_str(&body).context("parsing route response")
    }
}
