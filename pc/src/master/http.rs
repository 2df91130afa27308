//! HTTP client for the master's preemption endpoints

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ControlPlane, SignalError};
use crate::config::MasterConfig;

/// Timeout for requests that do not long-poll
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct PreemptionResponse {
    #[serde(default)]
    preempt: serde_json::Value,
}

/// Parse a preemption response body
///
/// Only a literal JSON `true` counts as a preemption signal; a missing field,
/// `null`, or any other value means "keep going".
pub fn parse_preemption(body: &[u8]) -> Result<bool, SignalError> {
    let response: PreemptionResponse =
        serde_json::from_slice(body).map_err(|e| SignalError::InvalidResponse(e.to_string()))?;
    Ok(response.preempt == serde_json::Value::Bool(true))
}

/// reqwest-backed [`ControlPlane`]
pub struct HttpControlPlane {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl HttpControlPlane {
    /// Create a client for the master at `base_url`
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, SignalError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, has_token = token.is_some(), "HttpControlPlane::new: called");
        let http = Client::builder().build().map_err(SignalError::Network)?;
        Ok(Self { base_url, token, http })
    }

    /// Create a client from configuration
    ///
    /// Reads the bearer token from the environment variable named in config, if any.
    pub fn from_config(config: &MasterConfig) -> Result<Self, SignalError> {
        debug!(?config, "HttpControlPlane::from_config: called");
        if config.url.is_empty() {
            return Err(SignalError::NotConfigured("master url is empty".to_string()));
        }
        Self::new(config.url.clone(), config.get_token())
    }

    fn preemption_url(&self, allocation_id: &str) -> String {
        format!("{}/api/v1/allocations/{}/signals/preemption", self.base_url, allocation_id)
    }

    fn ack_url(&self, allocation_id: &str) -> String {
        format!("{}/api/v1/allocations/{}/signals/ack_preemption", self.base_url, allocation_id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SignalError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(SignalError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn get_preemption(
        &self,
        allocation_id: &str,
        timeout_secs: u64,
        request_timeout: Duration,
    ) -> Result<bool, SignalError> {
        debug!(%allocation_id, timeout_secs, ?request_timeout, "HttpControlPlane::get_preemption: called");
        let request = self
            .http
            .get(self.preemption_url(allocation_id))
            .query(&[("timeout_seconds", timeout_secs.to_string())])
            .timeout(request_timeout);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SignalError::from_reqwest(e, request_timeout))?;
        let response = Self::check_status(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| SignalError::from_reqwest(e, request_timeout))?;

        let preempt = parse_preemption(&body)?;
        debug!(preempt, "HttpControlPlane::get_preemption: response");
        Ok(preempt)
    }

    async fn ack_preemption(&self, allocation_id: &str) -> Result<(), SignalError> {
        debug!(%allocation_id, "HttpControlPlane::ack_preemption: called");
        let request = self
            .http
            .post(self.ack_url(allocation_id))
            .timeout(DEFAULT_REQUEST_TIMEOUT);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SignalError::from_reqwest(e, DEFAULT_REQUEST_TIMEOUT))?;
        Self::check_status(response).await?;
        Ok(())
    }
}
