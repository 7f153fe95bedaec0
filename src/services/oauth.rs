// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ServiceNow OAuth2 (authorization code grant).

use crate::config::Config;
use crate::error::AppError;
use crate::models::OAuthToken;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_SLACK_SECS: i64 = 60;

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl From<TokenResponse> for OAuthToken {
    fn from(response: TokenResponse) -> Self {
        OAuthToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expiry: response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

/// Token endpoint operations used by the connect flow and the middleware.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the user is sent to in order to grant access.
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AppError>;

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthToken, AppError>;
}

#[derive(Clone)]
pub struct ServiceNowOAuth {
    http: reqwest::Client,
    servicenow_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl ServiceNowOAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            servicenow_url: config.servicenow_url.trim_end_matches('/').to_string(),
            client_id: config.servicenow_client_id.clone(),
            client_secret: config.servicenow_client_secret.clone(),
            redirect_url: format!(
                "{}/oauth2/complete",
                config.plugin_url.trim_end_matches('/')
            ),
        }
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<OAuthToken, AppError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(format!("{}/oauth_token.do", self.servicenow_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "ServiceNow token request failed");
            return Err(AppError::ServiceNow {
                status,
                message: format!("token request failed with status {}", status),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to parse token response: {}", e))
        })?;
        Ok(token.into())
    }
}

#[async_trait]
impl OAuthProvider for ServiceNowOAuth {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/oauth_auth.do?response_type=code&client_id={}&redirect_uri={}&state={}",
            self.servicenow_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AppError> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthToken, AppError> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

/// Whether the access token should be refreshed before the next call.
pub fn needs_refresh(token: &OAuthToken) -> bool {
    !token.refresh_token.is_empty()
        && token
            .expiry
            .is_some_and(|expiry| expiry <= Utc::now() + Duration::seconds(EXPIRY_SLACK_SECS))
}
