// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ServiceNow OAuth connect flow.
//!
//! The state parameter is `<random hex>_<mattermost user id>`. It is stored
//! on connect and consumed on completion, and the embedded user ID must match
//! the caller that completes the flow.

use crate::constants::{ERROR_MISSING_USER_CODE_STATE, ERROR_USER_ID_MISMATCH_IN_OAUTH};
use crate::error::{AppError, Result};
use crate::middleware::auth::mattermost_user_id;
use crate::models::User;
use crate::services::crypto::encrypt_token;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Random bytes in the OAuth state.
const STATE_ENTROPY_BYTES: usize = 15;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/oauth2/connect", get(connect))
        .route("/oauth2/complete", get(complete))
}

/// Start OAuth flow - redirect to the ServiceNow authorization page.
async fn connect(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Redirect> {
    let user_id = mattermost_user_id(&headers).ok_or(AppError::NotConnected)?;

    let oauth_state = format!("{}_{}", state.cipher.random_hex(STATE_ENTROPY_BYTES)?, user_id);
    state.store.store_oauth2_state(&oauth_state).await?;

    tracing::info!(mattermost_user_id = %user_id, "Starting OAuth flow, redirecting to ServiceNow");
    Ok(Redirect::temporary(&state.oauth.authorize_url(&oauth_state)))
}

#[derive(Deserialize)]
struct CompleteParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

/// OAuth callback - exchange the code and store the encrypted token.
async fn complete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CompleteParams>,
) -> Result<Html<&'static str>> {
    let user_id = mattermost_user_id(&headers).unwrap_or_default();
    if user_id.is_empty() || params.code.is_empty() || params.state.is_empty() {
        return Err(AppError::InvalidParameter(
            ERROR_MISSING_USER_CODE_STATE.to_string(),
        ));
    }

    state.store.verify_oauth2_state(&params.state).await?;

    let state_user_id = params
        .state
        .split_once('_')
        .map(|(_, user)| user)
        .unwrap_or_default();
    if state_user_id != user_id {
        tracing::warn!(
            mattermost_user_id = %user_id,
            "Security Alert: OAuth state belongs to a different user"
        );
        return Err(AppError::Forbidden(
            ERROR_USER_ID_MISMATCH_IN_OAUTH.to_string(),
        ));
    }

    let token = state.oauth.exchange_code(&params.code).await?;
    let user = User {
        mattermost_user_id: user_id.clone(),
        oauth2_token: encrypt_token(&state.cipher, &token, &user_id)?,
    };
    state.store.store_user(&user).await?;

    tracing::info!(mattermost_user_id = %user_id, "ServiceNow account connected");
    Ok(Html(COMPLETE_PAGE))
}

const COMPLETE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><script>window.close();</script></head>
<body><p>Completed connecting to ServiceNow. Please close this window.</p></body>
</html>
"#;
