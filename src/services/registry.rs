// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription lifecycle and record lookups on behalf of one user.
//!
//! Every subscription operation other than [`SubscriptionRegistry::activate`]
//! is refused until subscriptions were activated for the ServiceNow server.
//! The gate is checked against the store, so a refused call never reaches
//! ServiceNow.

use crate::constants::{
    self, CHARACTER_THRESHOLD_FOR_SEARCHING_RECORDS, DEFAULT_PAGE, DEFAULT_PER_PAGE, MAX_PER_PAGE,
    QUERY_SEPARATOR,
};
use crate::db::Store;
use crate::error::AppError;
use crate::models::subscription::SubscriptionKey;
use crate::models::{
    SearchableRecordType, ServiceNowPartialRecord, ServiceNowRecord, SubscriptionPayload,
    SubscriptionResponse, SubscriptionType,
};
use crate::services::servicenow::ServiceNowClient;
use reqwest::StatusCode;
use std::sync::Arc;

/// Resolved `page`/`per_page` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Parse raw query values. Missing or blank values take the defaults.
    pub fn parse(page: Option<&str>, per_page: Option<&str>) -> Result<Self, AppError> {
        let page = parse_count("page", page, DEFAULT_PAGE)?;
        let per_page = parse_count("per_page", per_page, DEFAULT_PER_PAGE)?;

        if per_page > MAX_PER_PAGE {
            return Err(AppError::InvalidParameter(format!(
                "per_page must not exceed {}",
                MAX_PER_PAGE
            )));
        }

        Ok(Self { page, per_page })
    }

    pub fn offset(&self) -> Result<u32, AppError> {
        self.page
            .checked_mul(self.per_page)
            .ok_or_else(|| AppError::InvalidParameter("page is out of range".to_string()))
    }
}

fn parse_count(name: &str, raw: Option<&str>, default: u32) -> Result<u32, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(value) => value.parse::<u32>().map_err(|_| {
            AppError::InvalidParameter(format!(
                "{} must be a non-negative integer, got {:?}",
                name, value
            ))
        }),
    }
}

/// Filters for [`SubscriptionRegistry::list`]. Empty strings mean "any".
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub channel_id: String,
    pub user_id: String,
    pub subscription_type: String,
}

pub struct SubscriptionRegistry {
    client: ServiceNowClient,
    store: Arc<dyn Store>,
    server_url: String,
}

impl SubscriptionRegistry {
    pub fn new(client: ServiceNowClient, store: Arc<dyn Store>, server_url: &str) -> Self {
        Self {
            client,
            store,
            server_url: server_url.to_string(),
        }
    }

    /// Verify the ServiceNow app is usable and open the gate for this server.
    pub async fn activate(&self) -> Result<StatusCode, AppError> {
        let status = self.client.activate_subscriptions().await?;
        self.store
            .mark_subscriptions_activated(&self.server_url)
            .await?;

        tracing::info!(server_url = %self.server_url, "Subscriptions activated");
        Ok(status)
    }

    pub async fn create(&self, payload: SubscriptionPayload) -> Result<StatusCode, AppError> {
        self.ensure_activated().await?;
        let payload = normalize(payload)?;

        let existing = self.find_existing(&payload).await?;
        if !existing.is_empty() {
            tracing::info!(
                channel_id = %payload.channel_id,
                record_type = %payload.record_type,
                "Rejected duplicate subscription"
            );
            return Err(AppError::DuplicateSubscription);
        }

        let status = self.client.create_subscription(&payload).await?;
        tracing::info!(
            channel_id = %payload.channel_id,
            subscription_type = %payload.subscription_type,
            record_type = %payload.record_type,
            "Subscription created"
        );
        Ok(status)
    }

    /// Replace a subscription. The subscription being edited does not count
    /// as its own duplicate.
    pub async fn edit(
        &self,
        subscription_id: &str,
        payload: SubscriptionPayload,
    ) -> Result<StatusCode, AppError> {
        self.ensure_activated().await?;
        let payload = normalize(payload)?;

        let existing = self.find_existing(&payload).await?;
        if existing.iter().any(|s| s.sys_id != subscription_id) {
            return Err(AppError::DuplicateSubscription);
        }

        let status = self
            .client
            .edit_subscription(subscription_id, &payload)
            .await?;
        tracing::info!(subscription_id, "Subscription updated");
        Ok(status)
    }

    pub async fn list(
        &self,
        filter: &SubscriptionFilter,
        pagination: Pagination,
    ) -> Result<Vec<SubscriptionResponse>, AppError> {
        self.ensure_activated().await?;
        reject_query_separator("channel ID", &filter.channel_id)?;
        reject_query_separator("user ID", &filter.user_id)?;

        // Accept the alias, query with the stored value.
        let subscription_type = match filter.subscription_type.as_str() {
            "" => "",
            raw => raw
                .parse::<SubscriptionType>()
                .map_err(|e| AppError::InvalidParameter(e.to_string()))?
                .as_str(),
        };

        let (subscriptions, _) = self
            .client
            .get_all_subscriptions(
                &filter.channel_id,
                &filter.user_id,
                subscription_type,
                pagination.per_page,
                pagination.offset()?,
            )
            .await?;
        Ok(subscriptions)
    }

    pub async fn get(&self, subscription_id: &str) -> Result<SubscriptionResponse, AppError> {
        self.ensure_activated().await?;
        let (subscription, _) = self.client.get_subscription(subscription_id).await?;
        Ok(subscription)
    }

    pub async fn delete(&self, subscription_id: &str) -> Result<StatusCode, AppError> {
        self.ensure_activated().await?;
        let status = self.client.delete_subscription(subscription_id).await?;
        tracing::info!(subscription_id, "Subscription deleted");
        Ok(status)
    }

    // ─── Records ─────────────────────────────────────────────────────────────

    pub async fn search_records(
        &self,
        record_type: &str,
        search_term: &str,
        pagination: Pagination,
    ) -> Result<Vec<ServiceNowPartialRecord>, AppError> {
        let table = searchable_table(record_type)?;

        let search_term = search_term.trim();
        if search_term.chars().count() < CHARACTER_THRESHOLD_FOR_SEARCHING_RECORDS {
            return Err(AppError::InvalidParameter(format!(
                "search term should be at least {} characters",
                CHARACTER_THRESHOLD_FOR_SEARCHING_RECORDS
            )));
        }
        reject_query_separator("search term", search_term)?;

        let (records, _) = self
            .client
            .search_records_in_servicenow(
                table,
                search_term,
                pagination.per_page,
                pagination.offset()?,
            )
            .await?;
        Ok(records)
    }

    pub async fn get_record(
        &self,
        record_type: &str,
        sys_id: &str,
    ) -> Result<ServiceNowRecord, AppError> {
        let table = searchable_table(record_type)?;

        match self.client.get_record_from_servicenow(table, sys_id).await {
            Ok((record, _)) => Ok(record),
            Err(AppError::ServiceNow { message, .. })
                if message.contains(constants::ERROR_ACL_RESTRICTS_RECORD_RETRIEVAL) =>
            {
                tracing::warn!(table, sys_id, error = %message, "Record retrieval denied by ACL");
                Err(AppError::InsufficientPermissions)
            }
            Err(e) => Err(e),
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    async fn ensure_activated(&self) -> Result<(), AppError> {
        if self.store.subscriptions_activated(&self.server_url).await? {
            Ok(())
        } else {
            Err(AppError::SubscriptionsNotConfigured)
        }
    }

    async fn find_existing(
        &self,
        payload: &SubscriptionPayload,
    ) -> Result<Vec<SubscriptionResponse>, AppError> {
        let (existing, _) = self.client.check_for_duplicate_subscription(payload).await?;
        Ok(existing)
    }
}

/// Validate and rewrite the payload into its stored form.
fn normalize(mut payload: SubscriptionPayload) -> Result<SubscriptionPayload, AppError> {
    let SubscriptionKey {
        subscription_type,
        record_type,
        record_id,
        ..
    } = payload.validate().map_err(AppError::InvalidParameter)?;

    reject_query_separator("channel ID", &payload.channel_id)?;
    reject_query_separator("user ID", &payload.user_id)?;
    reject_query_separator("server URL", &payload.server_url)?;
    reject_query_separator("record ID", record_id.unwrap_or_default())?;

    let record_id = record_id.map(str::to_string);
    payload.subscription_type = subscription_type.as_str().to_string();
    payload.record_type = record_type.as_str().to_string();
    payload.record_id = record_id;
    Ok(payload)
}

/// Values end up inside an encoded query, where `^` joins conditions.
fn reject_query_separator(field: &str, value: &str) -> Result<(), AppError> {
    if value.contains(QUERY_SEPARATOR) {
        return Err(AppError::InvalidParameter(format!(
            "{} should not contain '{}'",
            field, QUERY_SEPARATOR
        )));
    }
    Ok(())
}

fn searchable_table(record_type: &str) -> Result<&'static str, AppError> {
    record_type
        .parse::<SearchableRecordType>()
        .map(SearchableRecordType::table)
        .map_err(|e| AppError::InvalidParameter(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::services::transport::mock::{ok, MockTransport};
    use crate::services::transport::TransportError;
    use reqwest::Method;
    use serde_json::json;

    const SERVER: &str = "https://x";

    async fn registry(transport: &Arc<MockTransport>, activated: bool) -> SubscriptionRegistry {
        let store = Arc::new(InMemoryStore::new());
        if activated {
            store.mark_subscriptions_activated(SERVER).await.unwrap();
        }
        SubscriptionRegistry::new(
            ServiceNowClient::new(transport.clone(), "token"),
            store,
            SERVER,
        )
    }

    fn payload() -> SubscriptionPayload {
        SubscriptionPayload {
            channel_id: "C1".to_string(),
            user_id: "U1".to_string(),
            subscription_type: "record".to_string(),
            record_type: "incident".to_string(),
            record_id: Some("R1".to_string()),
            subscription_events: "state,priority".to_string(),
            server_url: SERVER.to_string(),
            is_active: true,
        }
    }

    /// Answers GETs with `existing` and everything else with `write_status`.
    fn scripted(existing: serde_json::Value, write_status: StatusCode) -> Arc<MockTransport> {
        Arc::new(MockTransport::new(move |request| {
            if request.method == Method::GET {
                Ok(ok(StatusCode::OK, json!({ "result": existing.clone() })))
            } else {
                Ok(ok(write_status, json!({ "result": {} })))
            }
        }))
    }

    #[test]
    fn test_pagination_defaults() {
        let pagination = Pagination::parse(None, None).unwrap();
        assert_eq!(
            pagination,
            Pagination {
                page: 0,
                per_page: 20
            }
        );
        assert_eq!(pagination.offset().unwrap(), 0);
    }

    #[test]
    fn test_pagination_offset() {
        let pagination = Pagination::parse(Some("3"), Some("25")).unwrap();
        assert_eq!(pagination.offset().unwrap(), 75);
    }

    #[test]
    fn test_pagination_rejects_bad_values() {
        for (page, per_page) in [
            (None, Some("101")),
            (Some("-1"), None),
            (None, Some("-5")),
            (Some("abc"), None),
            (None, Some("1.5")),
        ] {
            let err = Pagination::parse(page, per_page).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidParameter(_)),
                "page={:?} per_page={:?}",
                page,
                per_page
            );
        }
        assert!(Pagination::parse(None, Some("100")).is_ok());
    }

    #[tokio::test]
    async fn test_create_without_existing_posts_once() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, true).await;

        let status = registry.create(payload()).await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(transport.count(&Method::POST), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_never_posts() {
        let transport = scripted(json!([{"sys_id": "existing"}]), StatusCode::OK);
        let registry = registry(&transport, true).await;

        let err = registry.create(payload()).await.unwrap_err();

        assert!(matches!(err, AppError::DuplicateSubscription));
        assert_eq!(err.to_string(), constants::ERROR_SUBSCRIPTION_EXISTS);
        assert_eq!(transport.count(&Method::POST), 0);
    }

    #[tokio::test]
    async fn test_gate_blocks_without_remote_call() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, false).await;

        let err = registry.create(payload()).await.unwrap_err();
        assert_eq!(err.to_string(), "subscriptions_not_configured");

        assert!(registry.get("S").await.is_err());
        assert!(registry.delete("S").await.is_err());
        assert!(registry
            .list(&SubscriptionFilter::default(), Pagination::parse(None, None).unwrap())
            .await
            .is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_activate_opens_gate() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, false).await;

        registry.activate().await.unwrap();
        registry.create(payload()).await.unwrap();

        assert_eq!(transport.count(&Method::POST), 1);
    }

    #[tokio::test]
    async fn test_failed_activation_keeps_gate_closed() {
        let transport = Arc::new(MockTransport::fixed(
            StatusCode::FORBIDDEN,
            json!(null),
            Some("User Not Authorized"),
        ));
        let registry = registry(&transport, false).await;

        let err = registry.activate().await.unwrap_err();
        assert_eq!(err.to_string(), "subscriptions_not_authorized");

        let err = registry.get("S").await.unwrap_err();
        assert!(matches!(err, AppError::SubscriptionsNotConfigured));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected_before_remote_call() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, true).await;

        let mut bad = payload();
        bad.record_type = "spaceship".to_string();

        let err = registry.create(bad).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_separator_in_payload_is_rejected() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, true).await;

        let mut bad_channel = payload();
        bad_channel.channel_id = "C1^ORchannel_id!=".to_string();
        let mut bad_user = payload();
        bad_user.user_id = "U1^NQis_active=false".to_string();
        let mut bad_record = payload();
        bad_record.record_id = Some("R1^ORrecord_id=R2".to_string());
        let mut bad_server = payload();
        bad_server.server_url = format!("{}^", SERVER);

        for bad in [bad_channel, bad_user, bad_record, bad_server] {
            let err = registry.create(bad.clone()).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidParameter(_)), "{:?}", bad);
            let err = registry.edit("S1", bad).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidParameter(_)));
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_separator_in_filter_or_search_is_rejected() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, true).await;
        let pagination = Pagination::parse(None, None).unwrap();

        let filter = SubscriptionFilter {
            user_id: "U1^ORuser_id!=U1".to_string(),
            ..Default::default()
        };
        let err = registry.list(&filter, pagination).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter: user ID should not contain '^'");

        let err = registry
            .search_records("incident", "vpn^ORnumberISNOTEMPTY", pagination)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_alias_is_stored_as_object() {
        let transport = scripted(json!([]), StatusCode::CREATED);
        let registry = registry(&transport, true).await;

        let mut bulk = payload();
        bulk.subscription_type = "bulk".to_string();
        bulk.record_id = None;
        registry.create(bulk).await.unwrap();

        let post = transport
            .requests()
            .into_iter()
            .find(|r| r.method == Method::POST)
            .unwrap();
        assert_eq!(post.body.unwrap()["type"], "object");
    }

    #[tokio::test]
    async fn test_edit_ignores_itself() {
        let transport = scripted(json!([{"sys_id": "S1"}]), StatusCode::OK);
        let registry = registry(&transport, true).await;

        registry.edit("S1", payload()).await.unwrap();
        assert_eq!(transport.count(&Method::PATCH), 1);

        let err = registry.edit("S2", payload()).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateSubscription));
        assert_eq!(transport.count(&Method::PATCH), 1);
    }

    #[tokio::test]
    async fn test_list_normalizes_type_filter() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, true).await;

        let filter = SubscriptionFilter {
            channel_id: "C1".to_string(),
            subscription_type: "bulk".to_string(),
            ..Default::default()
        };
        registry
            .list(&filter, Pagination::parse(Some("2"), Some("10")).unwrap())
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(
            request.query_value("sysparm_query"),
            Some("is_active=true^channel_id=C1^type=object^ORDERBYDESCsys_updated_on")
        );
        assert_eq!(request.query_value("sysparm_offset"), Some("20"));
    }

    #[tokio::test]
    async fn test_search_term_threshold() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, false).await;
        let pagination = Pagination::parse(None, None).unwrap();

        let err = registry
            .search_records("incident", "ab", pagination)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
        assert!(transport.requests().is_empty());

        registry
            .search_records("incident", "abc", pagination)
            .await
            .unwrap();
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_search_accepts_non_subscribable_tables() {
        let transport = scripted(json!([]), StatusCode::OK);
        let registry = registry(&transport, false).await;
        let pagination = Pagination::parse(None, None).unwrap();

        registry
            .search_records("kb_knowledge", "vpn", pagination)
            .await
            .unwrap();
        assert_eq!(transport.requests()[0].path, "/api/now/table/kb_knowledge");

        let err = registry
            .search_records("sys_user", "admin", pagination)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_get_record_acl_denial() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(TransportError {
                status: StatusCode::FORBIDDEN,
                message: "ACL restricts the record retrieval".to_string(),
            })
        }));
        let registry = registry(&transport, false).await;

        let err = registry.get_record("incident", "abc").await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientPermissions));
    }

    #[tokio::test]
    async fn test_get_record_other_failure_is_verbatim() {
        let transport = Arc::new(MockTransport::fixed(
            StatusCode::NOT_FOUND,
            json!(null),
            Some("No Record found"),
        ));
        let registry = registry(&transport, false).await;

        let err = registry.get_record("problem", "abc").await.unwrap_err();
        assert_eq!(err.to_string(), "No Record found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
