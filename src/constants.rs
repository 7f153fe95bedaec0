// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire constants shared by the ServiceNow client, the registry and the routes.

/// Scope of the ServiceNow application that stores subscriptions.
pub const SERVICENOW_APP_ID: &str = "x_830655_mm_std";

pub const SYS_QUERY_PARAM: &str = "sysparm_query";
pub const SYS_QUERY_PARAM_LIMIT: &str = "sysparm_limit";
pub const SYS_QUERY_PARAM_OFFSET: &str = "sysparm_offset";
pub const SYS_QUERY_PARAM_FIELDS: &str = "sysparm_fields";
pub const SYS_QUERY_PARAM_DISPLAY_VALUE: &str = "sysparm_display_value";
/// Joins conditions in an encoded `sysparm_query`.
pub const QUERY_SEPARATOR: char = '^';

/// Header set by Mattermost on requests forwarded to the plugin.
pub const HEADER_MATTERMOST_USER_ID: &str = "Mattermost-User-Id";

// ─── Pagination ──────────────────────────────────────────────

pub const DEFAULT_PAGE: u32 = 0;
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;
pub const CHARACTER_THRESHOLD_FOR_SEARCHING_RECORDS: usize = 3;

// ─── ServiceNow table fields ─────────────────────────────────

pub const FIELD_NUMBER: &str = "number";
pub const FIELD_SHORT_DESCRIPTION: &str = "short_description";

// ─── API errors (id / message pairs rendered by the webapp) ──

pub const API_ERROR_ID_NOT_CONNECTED: &str = "not_connected";
pub const API_ERROR_NOT_CONNECTED: &str =
    "You have not connected your Mattermost account to ServiceNow.";
pub const API_ERROR_ID_SUBSCRIPTIONS_NOT_CONFIGURED: &str = "subscriptions_not_configured";
pub const API_ERROR_SUBSCRIPTIONS_NOT_CONFIGURED: &str =
    "Subscripitons are not configured for this server.";
pub const API_ERROR_ID_SUBSCRIPTIONS_NOT_AUTHORIZED: &str = "subscriptions_not_authorized";
pub const API_ERROR_SUBSCRIPTIONS_NOT_AUTHORIZED: &str =
    "You are not authorized to manage subscriptions in ServiceNow.";
pub const API_ERROR_ID_INSUFFICIENT_PERMISSIONS: &str = "insufficient_permissions";
pub const API_ERROR_INSUFFICIENT_PERMISSIONS: &str = "Insufficient Permissions";

// ─── Error strings matched against or returned verbatim ──────

pub const ERROR_ACL_RESTRICTS_RECORD_RETRIEVAL: &str = "ACL restricts the record retrieval";
pub const ERROR_INVALID_TABLE: &str = "Invalid table";
pub const ERROR_USER_ID_MISMATCH_IN_OAUTH: &str = "not authorized, user ID mismatch";
pub const ERROR_MISSING_USER_CODE_STATE: &str = "missing user, code or state";
pub const ERROR_OAUTH_STATE_EXPIRED: &str = "authentication attempt expired, please try again";
pub const ERROR_SUBSCRIPTION_EXISTS: &str = "subscription already exists";
