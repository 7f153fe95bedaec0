// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Change events pushed by ServiceNow and their notification rendering.

use crate::models::post::{Attachment, AttachmentField};
use crate::models::subscription::{RecordType, SubscriptionEvent};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder shown for unassigned records.
pub const NOT_AVAILABLE: &str = "N/A";

/// Notification payload sent by the ServiceNow business rule.
///
/// Built per webhook call; never stored. Missing and `null` fields decode as
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNowEvent {
    #[serde(rename = "sys_id", deserialize_with = "null_as_empty")]
    pub subscription_id: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub record_id: String,
    #[serde(rename = "mm_channel_id", deserialize_with = "null_as_empty")]
    pub channel_id: String,
    #[serde(rename = "mm_user_id", deserialize_with = "null_as_empty")]
    pub user_id: String,
    #[serde(rename = "type", deserialize_with = "null_as_empty")]
    pub subscription_type: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub record_type: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub record_type_name: String,
    #[serde(rename = "subscription_events", deserialize_with = "null_as_empty")]
    pub events: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub number: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub short_description: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub state: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub priority: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub assigned_to: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub assignment_group: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub event_occurred: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServiceNowEvent {
    /// Decode a raw webhook body.
    pub fn from_json(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    /// Deep link to the record inside the ServiceNow list view.
    pub fn record_link(&self, servicenow_url: &str) -> String {
        format!(
            "{}/nav_to.do?uri={}.do%3Fsys_id={}%26sysparm_stack={}_list.do%3Fsysparm_query=active=true",
            servicenow_url, self.record_type, self.record_id, self.record_type
        )
    }

    /// Human name of the record type. Falls back to the built-in name when
    /// the event does not carry one.
    pub fn record_type_label(&self) -> &str {
        if !self.record_type_name.is_empty() {
            return &self.record_type_name;
        }
        self.record_type
            .parse::<RecordType>()
            .map(RecordType::display_name)
            .unwrap_or(self.record_type.as_str())
    }

    /// Build the notification attachment. Field order is fixed.
    pub fn notification_attachment(&self, servicenow_url: &str) -> Attachment {
        Attachment {
            title: format!(
                "[{}]({}): {}",
                self.number,
                self.record_link(servicenow_url),
                self.short_description
            ),
            fields: vec![
                AttachmentField::short("Event", SubscriptionEvent::label_for(&self.event_occurred)),
                AttachmentField::short("Record", self.record_type_label()),
                AttachmentField::short("State", self.state.as_str()),
                AttachmentField::short("Priority", self.priority.as_str()),
                AttachmentField::short("Assigned to", or_not_available(&self.assigned_to)),
                AttachmentField::short(
                    "Assignment group",
                    or_not_available(&self.assignment_group),
                ),
            ],
        }
    }
}

fn or_not_available(value: &str) -> &str {
    if value.is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}
