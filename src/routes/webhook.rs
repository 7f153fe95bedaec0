// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification webhook called by ServiceNow.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/notification", post(handle_notification))
}

#[derive(Deserialize)]
struct NotificationParams {
    #[serde(default)]
    secret: String,
}

fn secret_matches(received: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(received.as_bytes().ct_eq(expected.as_bytes()))
}

/// Handle one change event (POST). The body is read raw so that a malformed
/// payload is reported as such rather than as an extractor rejection.
async fn handle_notification(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotificationParams>,
    body: Bytes,
) -> Result<StatusCode> {
    if !secret_matches(&params.secret, &state.config.webhook_secret) {
        tracing::warn!("Security Alert: notification with invalid webhook secret");
        return Err(AppError::Forbidden("invalid webhook secret".to_string()));
    }

    state.notifier().handle_inbound_event(&body).await?;
    Ok(StatusCode::OK)
}
