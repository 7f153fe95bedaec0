// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turns ServiceNow change events into channel notifications.
//!
//! Delivery is at most once: a failed post is reported back and not retried
//! here. ServiceNow may resend the webhook, and every delivery is handled as
//! a new event.

use crate::error::AppError;
use crate::models::ServiceNowEvent;
use crate::services::chat::ChatPoster;
use std::sync::Arc;

#[derive(Clone)]
pub struct EventNotifier {
    chat: Arc<dyn ChatPoster>,
    bot_user_id: String,
    servicenow_url: String,
}

impl EventNotifier {
    pub fn new(chat: Arc<dyn ChatPoster>, bot_user_id: &str, servicenow_url: &str) -> Self {
        Self {
            chat,
            bot_user_id: bot_user_id.to_string(),
            servicenow_url: servicenow_url.trim_end_matches('/').to_string(),
        }
    }

    /// Decode, render and post one inbound event.
    pub async fn handle_inbound_event(&self, raw: &[u8]) -> Result<ServiceNowEvent, AppError> {
        let event = ServiceNowEvent::from_json(raw).map_err(|e| {
            tracing::warn!(error = %e, "Failed to decode ServiceNow event");
            AppError::MalformedPayload(e.to_string())
        })?;

        if event.channel_id.is_empty() {
            return Err(AppError::MalformedPayload(
                "event has no target channel".to_string(),
            ));
        }

        let attachment = event.notification_attachment(&self.servicenow_url);

        self.chat
            .post_message(&event.channel_id, &self.bot_user_id, &attachment)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    error = %e,
                    channel_id = %event.channel_id,
                    subscription_id = %event.subscription_id,
                    "Failed to post notification"
                )
            })?;

        tracing::info!(
            channel_id = %event.channel_id,
            subscription_id = %event.subscription_id,
            record_type = %event.record_type,
            event = %event.event_occurred,
            "Notification posted"
        );

        Ok(event)
    }
}
