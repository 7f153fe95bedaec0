// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for connected users.

use crate::error::Result;
use crate::middleware::auth::ConnectedUser;
use crate::models::{
    ServiceNowPartialRecord, ServiceNowRecord, SubscriptionPayload, SubscriptionResponse,
};
use crate::services::{Pagination, SubscriptionFilter};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require a connected user).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/disconnect", post(disconnect))
        .route("/api/v1/subscriptions/activate", post(activate_subscriptions))
        .route(
            "/api/v1/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/api/v1/subscriptions/{id}",
            get(get_subscription)
                .patch(edit_subscription)
                .delete(delete_subscription),
        )
        .route("/api/v1/records/{record_type}", get(search_records))
        .route(
            "/api/v1/records/{record_type}/{record_id}",
            get(get_record),
        )
}

/// Body returned by mutating endpoints.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "OK".to_string(),
        })
    }
}

// ─── Account ─────────────────────────────────────────────────

/// Forget the caller's ServiceNow token.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
) -> Result<Json<StatusResponse>> {
    state.store.delete_user(&user.mattermost_user_id).await?;
    tracing::info!(mattermost_user_id = %user.mattermost_user_id, "User disconnected");
    Ok(StatusResponse::ok())
}

// ─── Subscriptions ───────────────────────────────────────────

async fn activate_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
) -> Result<Json<StatusResponse>> {
    state.registry(&user.access_token).activate().await?;
    Ok(StatusResponse::ok())
}

async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
    Json(payload): Json<SubscriptionPayload>,
) -> Result<Json<StatusResponse>> {
    let payload = with_defaults(payload, &state, &user);
    state.registry(&user.access_token).create(payload).await?;
    Ok(StatusResponse::ok())
}

/// Fill in the owner and server when the client left them out, so a write
/// never blanks them in ServiceNow.
fn with_defaults(
    mut payload: SubscriptionPayload,
    state: &AppState,
    user: &ConnectedUser,
) -> SubscriptionPayload {
    if payload.user_id.is_empty() {
        payload.user_id = user.mattermost_user_id.clone();
    }
    if payload.server_url.is_empty() {
        payload.server_url = state.config.servicenow_url.clone();
    }
    payload
}

#[derive(Debug, Deserialize)]
struct ListSubscriptionsQuery {
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    subscription_type: String,
    page: Option<String>,
    per_page: Option<String>,
}

async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<Json<Vec<SubscriptionResponse>>> {
    let pagination = Pagination::parse(query.page.as_deref(), query.per_page.as_deref())?;
    let filter = SubscriptionFilter {
        channel_id: query.channel_id,
        user_id: query.user_id,
        subscription_type: query.subscription_type,
    };

    let subscriptions = state
        .registry(&user.access_token)
        .list(&filter, pagination)
        .await?;
    Ok(Json(subscriptions))
}

async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionResponse>> {
    let subscription = state.registry(&user.access_token).get(&id).await?;
    Ok(Json(subscription))
}

async fn edit_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
    Path(id): Path<String>,
    Json(payload): Json<SubscriptionPayload>,
) -> Result<Json<StatusResponse>> {
    let payload = with_defaults(payload, &state, &user);
    state.registry(&user.access_token).edit(&id, payload).await?;
    Ok(StatusResponse::ok())
}

async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    state.registry(&user.access_token).delete(&id).await?;
    Ok(StatusResponse::ok())
}

// ─── Records ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: String,
    page: Option<String>,
    per_page: Option<String>,
}

async fn search_records(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
    Path(record_type): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ServiceNowPartialRecord>>> {
    let pagination = Pagination::parse(query.page.as_deref(), query.per_page.as_deref())?;

    let records = state
        .registry(&user.access_token)
        .search_records(&record_type, &query.search, pagination)
        .await?;
    Ok(Json(records))
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<ConnectedUser>,
    Path((record_type, record_id)): Path<(String, String)>,
) -> Result<Json<ServiceNowRecord>> {
    let record = state
        .registry(&user.access_token)
        .get_record(&record_type, &record_id)
        .await?;
    Ok(Json(record))
}
