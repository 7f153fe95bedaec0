// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ServiceNow API client for subscriptions and record lookups.
//!
//! Handles:
//! - Subscription activation, CRUD and duplicate lookup
//! - Record search and single-record fetch
//!
//! Each subscription call prefixes its failure with a fixed message naming
//! the operation; the webapp shows those strings verbatim. Record search and
//! fetch return the transport message untouched because callers inspect it
//! (ACL restrictions, for one).

use crate::constants::{self, SERVICENOW_APP_ID};
use crate::error::AppError;
use crate::models::subscription::SubscriptionType;
use crate::models::{
    ServiceNowPartialRecord, ServiceNowRecord, SubscriptionPayload, SubscriptionResponse,
    TableResponse,
};
use crate::services::transport::{HttpTransport, RemoteRequest, RemoteResponse, TransportError};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

const ERR_SUBSCRIPTION_AUTH: &str = "failed to get subscription auth details";
const ERR_CREATE: &str = "failed to create subscription in ServiceNow";
const ERR_LIST: &str = "failed to get subscriptions from ServiceNow";
const ERR_GET: &str = "failed to get subscription from ServiceNow";
const ERR_DELETE: &str = "failed to delete subscription from ServiceNow";
const ERR_UPDATE: &str = "failed to update subscription from ServiceNow";

const SUBSCRIPTION_FIELDS: &str = "sys_id,user_id,channel_id,type,record_type,record_id,\
subscription_events,server_url,is_active,number,short_description";
const PARTIAL_RECORD_FIELDS: &str = "sys_id,number,short_description";
const RECORD_FIELDS: &str =
    "sys_id,number,short_description,state,priority,assigned_to,assignment_group";

fn subscriptions_path() -> String {
    format!(
        "/api/now/table/{}_servicenow_for_mm_subscriptions",
        SERVICENOW_APP_ID
    )
}

fn subscription_auth_path() -> String {
    format!(
        "/api/now/table/{}_servicenow_for_mm_subscription_auth",
        SERVICENOW_APP_ID
    )
}

/// ServiceNow client bound to one user's access token.
#[derive(Clone)]
pub struct ServiceNowClient {
    transport: Arc<dyn HttpTransport>,
    access_token: String,
}

impl ServiceNowClient {
    pub fn new(transport: Arc<dyn HttpTransport>, access_token: impl Into<String>) -> Self {
        Self {
            transport,
            access_token: access_token.into(),
        }
    }

    // ─── Subscriptions ───────────────────────────────────────────────────────

    /// Check that the notifications app is installed and usable by this user.
    ///
    /// Safe to call repeatedly; it only reads the subscription-auth table.
    pub async fn activate_subscriptions(&self) -> Result<StatusCode, AppError> {
        let request = RemoteRequest::new(Method::GET, subscription_auth_path())
            .query(constants::SYS_QUERY_PARAM_LIMIT, 1);

        match self.call(request).await {
            Ok(response) => Ok(response.status),
            Err(e) if e.status == StatusCode::FORBIDDEN => {
                tracing::warn!(error = %e, "User not authorized to manage subscriptions");
                Err(AppError::SubscriptionsNotAuthorized)
            }
            Err(e) if e.message.contains(constants::ERROR_INVALID_TABLE) => {
                tracing::warn!(error = %e, "Subscription tables missing in ServiceNow");
                Err(AppError::SubscriptionsNotConfigured)
            }
            Err(e) => Err(wrap(ERR_SUBSCRIPTION_AUTH, e)),
        }
    }

    pub async fn create_subscription(
        &self,
        payload: &SubscriptionPayload,
    ) -> Result<StatusCode, AppError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode payload: {}", e)))?;
        let request = RemoteRequest::new(Method::POST, subscriptions_path()).json(body);

        let response = self.call(request).await.map_err(|e| wrap(ERR_CREATE, e))?;
        Ok(response.status)
    }

    /// List active subscriptions. Empty filters are left out of the query.
    pub async fn get_all_subscriptions(
        &self,
        channel_id: &str,
        user_id: &str,
        subscription_type: &str,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<SubscriptionResponse>, StatusCode), AppError> {
        let mut query = vec!["is_active=true".to_string()];
        push_filter(&mut query, "channel_id", channel_id);
        push_filter(&mut query, "user_id", user_id);
        push_filter(&mut query, "type", subscription_type);
        query.push("ORDERBYDESCsys_updated_on".to_string());

        let request = RemoteRequest::new(Method::GET, subscriptions_path())
            .query(constants::SYS_QUERY_PARAM, query.join("^"))
            .query(constants::SYS_QUERY_PARAM_FIELDS, SUBSCRIPTION_FIELDS)
            .query(constants::SYS_QUERY_PARAM_LIMIT, limit)
            .query(constants::SYS_QUERY_PARAM_OFFSET, offset);

        self.fetch(request, ERR_LIST).await
    }

    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<(SubscriptionResponse, StatusCode), AppError> {
        let request = RemoteRequest::new(
            Method::GET,
            format!("{}/{}", subscriptions_path(), subscription_id),
        )
        .query(constants::SYS_QUERY_PARAM_FIELDS, SUBSCRIPTION_FIELDS);

        let response = self
            .call(request)
            .await
            .map_err(|e| wrap_single(ERR_GET, e))?;
        decode(&response).map_err(|e| wrap(ERR_GET, e))
    }

    pub async fn delete_subscription(&self, subscription_id: &str) -> Result<StatusCode, AppError> {
        let request = RemoteRequest::new(
            Method::DELETE,
            format!("{}/{}", subscriptions_path(), subscription_id),
        );

        let response = self
            .call(request)
            .await
            .map_err(|e| wrap_single(ERR_DELETE, e))?;
        Ok(response.status)
    }

    pub async fn edit_subscription(
        &self,
        subscription_id: &str,
        payload: &SubscriptionPayload,
    ) -> Result<StatusCode, AppError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode payload: {}", e)))?;
        let request = RemoteRequest::new(
            Method::PATCH,
            format!("{}/{}", subscriptions_path(), subscription_id),
        )
        .json(body);

        let response = self
            .call(request)
            .await
            .map_err(|e| wrap_single(ERR_UPDATE, e))?;
        Ok(response.status)
    }

    /// Active subscriptions sharing the payload's scoping key.
    pub async fn check_for_duplicate_subscription(
        &self,
        payload: &SubscriptionPayload,
    ) -> Result<(Vec<SubscriptionResponse>, StatusCode), AppError> {
        let subscription_type = payload.subscription_type.parse::<SubscriptionType>().ok();

        let mut query = vec!["is_active=true".to_string()];
        push_filter(&mut query, "channel_id", &payload.channel_id);
        push_filter(
            &mut query,
            "type",
            subscription_type
                .map(SubscriptionType::as_str)
                .unwrap_or(&payload.subscription_type),
        );
        push_filter(&mut query, "record_type", &payload.record_type);
        if subscription_type == Some(SubscriptionType::Record) {
            push_filter(
                &mut query,
                "record_id",
                payload.record_id.as_deref().unwrap_or_default(),
            );
        }
        push_filter(&mut query, "server_url", &payload.server_url);

        let request = RemoteRequest::new(Method::GET, subscriptions_path())
            .query(constants::SYS_QUERY_PARAM, query.join("^"))
            .query(constants::SYS_QUERY_PARAM_FIELDS, SUBSCRIPTION_FIELDS);

        self.fetch(request, ERR_LIST).await
    }

    // ─── Records ─────────────────────────────────────────────────────────────

    /// Search a table by number or short description.
    pub async fn search_records_in_servicenow(
        &self,
        table: &str,
        search_term: &str,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<ServiceNowPartialRecord>, StatusCode), AppError> {
        let query = format!(
            "{}LIKE{}^OR{}LIKE{}",
            constants::FIELD_NUMBER,
            search_term,
            constants::FIELD_SHORT_DESCRIPTION,
            search_term
        );
        let request = RemoteRequest::new(Method::GET, format!("/api/now/table/{}", table))
            .query(constants::SYS_QUERY_PARAM, query)
            .query(constants::SYS_QUERY_PARAM_FIELDS, PARTIAL_RECORD_FIELDS)
            .query(constants::SYS_QUERY_PARAM_LIMIT, limit)
            .query(constants::SYS_QUERY_PARAM_OFFSET, offset);

        self.fetch_unwrapped(request).await
    }

    pub async fn get_record_from_servicenow(
        &self,
        table: &str,
        sys_id: &str,
    ) -> Result<(ServiceNowRecord, StatusCode), AppError> {
        let request =
            RemoteRequest::new(Method::GET, format!("/api/now/table/{}/{}", table, sys_id))
                .query(constants::SYS_QUERY_PARAM_FIELDS, RECORD_FIELDS)
                .query(constants::SYS_QUERY_PARAM_DISPLAY_VALUE, true);

        self.fetch_unwrapped(request).await
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse, TransportError> {
        tracing::debug!(method = %request.method, path = %request.path, "Calling ServiceNow");
        self.transport.call_json(&self.access_token, request).await
    }

    /// Call and decode `{"result": T}`, prefixing any failure.
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RemoteRequest,
        prefix: &str,
    ) -> Result<(T, StatusCode), AppError> {
        let response = self.call(request).await.map_err(|e| wrap(prefix, e))?;
        decode(&response).map_err(|e| wrap(prefix, e))
    }

    /// Call and decode `{"result": T}`, surfacing failures verbatim.
    async fn fetch_unwrapped<T: DeserializeOwned>(
        &self,
        request: RemoteRequest,
    ) -> Result<(T, StatusCode), AppError> {
        let response = self.call(request).await.map_err(passthrough)?;
        decode(&response).map_err(passthrough)
    }
}

fn push_filter(query: &mut Vec<String>, field: &str, value: &str) {
    if !value.is_empty() {
        query.push(format!("{}={}", field, value));
    }
}

fn decode<T: DeserializeOwned>(response: &RemoteResponse) -> Result<(T, StatusCode), TransportError> {
    serde_json::from_slice::<TableResponse<T>>(&response.body)
        .map(|parsed| (parsed.result, response.status))
        .map_err(|e| TransportError {
            status: response.status,
            message: format!("failed to decode ServiceNow response: {}", e),
        })
}

fn wrap(prefix: &str, err: TransportError) -> AppError {
    AppError::ServiceNow {
        status: err.status,
        message: format!("{}: {}", prefix, err.message),
    }
}

/// Like [`wrap`], but a missing subscription is reported as not found.
fn wrap_single(prefix: &str, err: TransportError) -> AppError {
    if err.status == StatusCode::NOT_FOUND {
        AppError::NotFound(format!("{}: {}", prefix, err.message))
    } else {
        wrap(prefix, err)
    }
}

fn passthrough(err: TransportError) -> AppError {
    AppError::ServiceNow {
        status: err.status,
        message: err.message,
    }
}
