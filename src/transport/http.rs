//! HTTP transport for the dialer API (reqwest)
//!
//! Routes, relative to the configured base URL:
//! - `GET  /api/status`
//! - `GET  /api/leads?page=<n>`
//! - `GET  /api/campaigns`
//! - `POST /api/start_call`      `{ "index": n, "campaign": "key" }`
//! - `POST /api/end_call`        `{ "auto_next": bool }`
//! - `POST /api/stop_all`
//! - `POST /api/auto_next`       `{ "enabled": bool }`
//! - `POST /api/select_campaign` `{ "campaign": "key" | null }`
//!
//! Error bodies are `{ "ok": false, "error": "...", "code": "..." }`. A 2xx
//! body with `"ok": false` is treated the same as an error status.

use super::DialerApi;
use crate::error::{ApiError, ValidationError};
use crate::model::{
    CallStatus, Campaign, Page, SessionAck, StartAck, StartCallRequest, WireCampaigns,
    WireErrorBody, WirePage, WireStatus,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Dialer API over HTTP + JSON
pub struct HttpDialerApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDialerApi {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!(base_url, timeout_ms = timeout.as_millis() as u64, "HTTP dialer client ready");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        read_json(response).await
    }
}

/// Map reqwest send/read failures onto the error taxonomy
fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Read a response body, classifying failures
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport_error)?;

    if !status.is_success() {
        let body: WireErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
        return Err(classify_failure(status, body));
    }

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::malformed(format!("invalid JSON: {}", e)))?;

    if value.get("ok").and_then(|ok| ok.as_bool()) == Some(false) {
        let body: WireErrorBody = serde_json::from_value(value).unwrap_or_default();
        return Err(classify_failure(StatusCode::BAD_REQUEST, body));
    }

    serde_json::from_value(value).map_err(|e| ApiError::malformed(e.to_string()))
}

/// Turn an error status and body into a specific [`ApiError`]
pub(crate) fn classify_failure(status: StatusCode, body: WireErrorBody) -> ApiError {
    let message = body
        .error
        .or(body.detail)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

    match body.code.as_deref() {
        Some("call_running") => return ApiError::Conflict(message),
        Some("invalid_index") => return ValidationError::InvalidIndex.into(),
        Some("no_campaign") => return ValidationError::NoActiveCampaign.into(),
        _ => {}
    }

    match status {
        StatusCode::CONFLICT => ApiError::Conflict(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ApiError::Timeout,
        s if s.is_server_error() => ApiError::Network(format!("{}: {}", s.as_u16(), message)),
        _ => ValidationError::Rejected(message).into(),
    }
}

#[async_trait::async_trait]
impl DialerApi for HttpDialerApi {
    async fn status(&self) -> Result<CallStatus, ApiError> {
        let wire: WireStatus = self.send(self.client.get(self.url("/api/status"))).await?;
        Ok(CallStatus::from_wire(wire)?)
    }

    async fn leads(&self, page: u32) -> Result<Page, ApiError> {
        let request = self
            .client
            .get(self.url("/api/leads"))
            .query(&[("page", page)]);
        let wire: WirePage = self.send(request).await?;
        Ok(Page::from_wire(wire)?)
    }

    async fn start_call(&self, index: u64, campaign: &str) -> Result<StartAck, ApiError> {
        let request = self
            .client
            .post(self.url("/api/start_call"))
            .json(&StartCallRequest { index, campaign });
        self.send(request).await
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>, ApiError> {
        let wire: WireCampaigns = self.send(self.client.get(self.url("/api/campaigns"))).await?;
        Ok(wire.campaigns)
    }

    async fn end_call(&self, auto_next: bool) -> Result<SessionAck, ApiError> {
        let request = self
            .client
            .post(self.url("/api/end_call"))
            .json(&serde_json::json!({ "auto_next": auto_next }));
        self.send(request).await
    }

    async fn stop_all(&self) -> Result<SessionAck, ApiError> {
        self.send(self.client.post(self.url("/api/stop_all"))).await
    }

    async fn set_auto_next(&self, enabled: bool) -> Result<SessionAck, ApiError> {
        let request = self
            .client
            .post(self.url("/api/auto_next"))
            .json(&serde_json::json!({ "enabled": enabled }));
        self.send(request).await
    }

    async fn select_campaign(&self, campaign: Option<&str>) -> Result<SessionAck, ApiError> {
        let request = self
            .client
            .post(self.url("/api/select_campaign"))
            .json(&serde_json::json!({ "campaign": campaign }));
        self.send(request).await
    }
}
