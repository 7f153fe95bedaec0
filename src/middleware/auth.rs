// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connected-user middleware.
//!
//! Mattermost forwards plugin requests with the caller's ID in the
//! `Mattermost-User-Id` header. A request is let through only if that user
//! has a stored token we can still decrypt.

use crate::constants::HEADER_MATTERMOST_USER_ID;
use crate::error::AppError;
use crate::models::User;
use crate::services::crypto::{decrypt_token, encrypt_token};
use crate::services::oauth::needs_refresh;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Caller resolved by [`require_user`].
#[derive(Debug, Clone)]
pub struct ConnectedUser {
    pub mattermost_user_id: String,
    pub access_token: String,
}

/// Mattermost user ID from the request headers, if present and non-empty.
pub fn mattermost_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HEADER_MATTERMOST_USER_ID)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Middleware that requires a connected ServiceNow account.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mattermost_user_id =
        mattermost_user_id(request.headers()).ok_or(AppError::NotConnected)?;

    let user = state
        .store
        .load_user(&mattermost_user_id)
        .await?
        .ok_or(AppError::NotConnected)?;

    let access_token = connected_access_token(&state, &user).await?;

    request.extensions_mut().insert(ConnectedUser {
        mattermost_user_id,
        access_token,
    });

    Ok(next.run(request).await)
}

/// Decrypt the user's token, refreshing it first if it is about to expire.
async fn connected_access_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let token = decrypt_token(&state.cipher, &user.oauth2_token, &user.mattermost_user_id)
        .map_err(|e| {
            tracing::warn!(
                error = %e,
                mattermost_user_id = %user.mattermost_user_id,
                "Stored token could not be decrypted"
            );
            AppError::NotConnected
        })?;

    if !needs_refresh(&token) {
        return Ok(token.access_token);
    }

    tracing::debug!(mattermost_user_id = %user.mattermost_user_id, "Refreshing ServiceNow token");
    let refreshed = state.oauth.refresh(&token.refresh_token).await.map_err(|e| {
        tracing::warn!(
            error = %e,
            mattermost_user_id = %user.mattermost_user_id,
            "Token refresh failed"
        );
        AppError::NotConnected
    })?;

    let updated = User {
        mattermost_user_id: user.mattermost_user_id.clone(),
        oauth2_token: encrypt_token(&state.cipher, &refreshed, &user.mattermost_user_id)?,
    };
    state.store.store_user(&updated).await?;

    Ok(refreshed.access_token)
}
