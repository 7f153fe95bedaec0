// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every error renders as `{"id": ..., "message": ...}`. The ids are stable
//! codes the webapp switches on, so the coded authorization errors also use
//! the id as their `Display` text.

use crate::constants;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not_connected")]
    NotConnected,

    #[error("subscriptions_not_configured")]
    SubscriptionsNotConfigured,

    #[error("subscriptions_not_authorized")]
    SubscriptionsNotAuthorized,

    #[error("insufficient_permissions")]
    InsufficientPermissions,

    #[error("{}", constants::ERROR_SUBSCRIPTION_EXISTS)]
    DuplicateSubscription,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A ServiceNow call failed. `message` is already prefixed with the
    /// operation that failed and is shown to end users as-is.
    #[error("{message}")]
    ServiceNow { status: StatusCode, message: String },

    #[error("Failed to post message: {0}")]
    Chat(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable error id exposed to callers.
    pub fn id(&self) -> &'static str {
        match self {
            AppError::NotConnected => constants::API_ERROR_ID_NOT_CONNECTED,
            AppError::SubscriptionsNotConfigured => {
                constants::API_ERROR_ID_SUBSCRIPTIONS_NOT_CONFIGURED
            }
            AppError::SubscriptionsNotAuthorized => {
                constants::API_ERROR_ID_SUBSCRIPTIONS_NOT_AUTHORIZED
            }
            AppError::InsufficientPermissions => constants::API_ERROR_ID_INSUFFICIENT_PERMISSIONS,
            AppError::DuplicateSubscription => "duplicate_subscription",
            AppError::InvalidParameter(_) => "invalid_parameter",
            AppError::MalformedPayload(_) => "malformed_payload",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::ServiceNow { .. } => "servicenow_error",
            AppError::Chat(_) => "chat_error",
            AppError::Store(_) => "store_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Human-readable message paired with [`AppError::id`].
    pub fn message(&self) -> String {
        match self {
            AppError::NotConnected => constants::API_ERROR_NOT_CONNECTED.to_string(),
            AppError::SubscriptionsNotConfigured => {
                constants::API_ERROR_SUBSCRIPTIONS_NOT_CONFIGURED.to_string()
            }
            AppError::SubscriptionsNotAuthorized => {
                constants::API_ERROR_SUBSCRIPTIONS_NOT_AUTHORIZED.to_string()
            }
            AppError::InsufficientPermissions => {
                constants::API_ERROR_INSUFFICIENT_PERMISSIONS.to_string()
            }
            // Internal details stay in the logs.
            AppError::Store(_) | AppError::Internal(_) => "Something went wrong.".to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status used when the error reaches a client.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotConnected => StatusCode::UNAUTHORIZED,
            AppError::SubscriptionsNotConfigured
            | AppError::DuplicateSubscription
            | AppError::InvalidParameter(_)
            | AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::SubscriptionsNotAuthorized
            | AppError::InsufficientPermissions
            | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceNow { status, .. } => {
                if status.is_client_error() || status.is_server_error() {
                    *status
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            AppError::Chat(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    id: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Store(msg) => tracing::error!(error = %msg, "Store error"),
            AppError::Internal(err) => tracing::error!(error = %err, "Internal server error"),
            AppError::ServiceNow { status, message } => {
                tracing::warn!(status = %status, error = %message, "ServiceNow call failed")
            }
            _ => {}
        }

        let body = ErrorResponse {
            id: self.id(),
            message: self.message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coded_errors_display_their_id() {
        assert_eq!(
            AppError::SubscriptionsNotAuthorized.to_string(),
            "subscriptions_not_authorized"
        );
        assert_eq!(
            AppError::SubscriptionsNotConfigured.to_string(),
            "subscriptions_not_configured"
        );
        assert_eq!(AppError::NotConnected.to_string(), "not_connected");
    }

    #[test]
    fn test_servicenow_status_passthrough() {
        let err = AppError::ServiceNow {
            status: StatusCode::NOT_FOUND,
            message: "failed to get subscription from ServiceNow: No Record found".to_string(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = AppError::ServiceNow {
            status: StatusCode::OK,
            message: "failed to get subscriptions from ServiceNow: bad json".to_string(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Store("disk full".to_string());
        assert_eq!(err.message(), "Something went wrong.");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
