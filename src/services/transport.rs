// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP transport to the ServiceNow REST API.
//!
//! [`ServiceNowClient`](super::servicenow::ServiceNowClient) only talks to
//! ServiceNow through [`HttpTransport`], so tests can hand it a double that
//! returns canned statuses and bodies.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;

/// One JSON call against the ServiceNow instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    /// Path below the instance URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl RemoteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of a query parameter, if set.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Failed call. `message` is the most specific cause available: ServiceNow's
/// own error message when it sent one, otherwise the transport error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub status: StatusCode,
    pub message: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn call_json(
        &self,
        access_token: &str,
        request: RemoteRequest,
    ) -> Result<RemoteResponse, TransportError>;
}

/// ServiceNow error envelope: `{"error": {"message": .., "detail": ..}, "status": "failure"}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Production transport over reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn call_json(
        &self,
        access_token: &str,
        request: RemoteRequest,
    ) -> Result<RemoteResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| TransportError {
            status: e.status().unwrap_or(StatusCode::BAD_GATEWAY),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError {
                status,
                message: e.to_string(),
            })?
            .to_vec();

        if status.is_success() {
            return Ok(RemoteResponse { status, body });
        }

        let message = serde_json::from_slice::<ErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}: {}", status, String::from_utf8_lossy(&body)));

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = %status,
            error = %message,
            "ServiceNow request failed"
        );

        Err(TransportError { status, message })
    }
}
