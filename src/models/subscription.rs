// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription models and the finite vocabularies they are built from.
//!
//! The wire models keep plain strings (they round-trip through ServiceNow and
//! the webapp unchanged); the enums below are what validation parses them into.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a wire string is not part of a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} \"{value}\"")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ─── Subscription type ───────────────────────────────────────

/// Scope of a subscription: one record, or every record of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionType {
    #[serde(rename = "record")]
    Record,
    /// Stored as `"object"` in ServiceNow.
    #[serde(rename = "object", alias = "bulk")]
    Bulk,
}

impl SubscriptionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionType::Record => "record",
            SubscriptionType::Bulk => "object",
        }
    }
}

impl FromStr for SubscriptionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "record" => Ok(SubscriptionType::Record),
            "object" | "bulk" => Ok(SubscriptionType::Bulk),
            other => Err(UnknownVariant::new("subscription type", other)),
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Record types ────────────────────────────────────────────

/// Record types that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Incident,
    Problem,
    ChangeRequest,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Incident => "incident",
            RecordType::Problem => "problem",
            RecordType::ChangeRequest => "change_request",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RecordType::Incident => "Incident",
            RecordType::Problem => "Problem",
            RecordType::ChangeRequest => "Change Request",
        }
    }
}

impl FromStr for RecordType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incident" => Ok(RecordType::Incident),
            "problem" => Ok(RecordType::Problem),
            "change_request" => Ok(RecordType::ChangeRequest),
            other => Err(UnknownVariant::new("record type", other)),
        }
    }
}

/// Tables the search and lookup endpoints may read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchableRecordType {
    Subscribable(RecordType),
    Knowledge,
    Task,
    ChangeTask,
    FollowOnTask,
}

impl SearchableRecordType {
    /// ServiceNow table name.
    pub fn table(self) -> &'static str {
        match self {
            SearchableRecordType::Subscribable(record_type) => record_type.as_str(),
            SearchableRecordType::Knowledge => "kb_knowledge",
            SearchableRecordType::Task => "task",
            SearchableRecordType::ChangeTask => "change_task",
            SearchableRecordType::FollowOnTask => "cert_follow_on_task",
        }
    }
}

impl FromStr for SearchableRecordType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kb_knowledge" => Ok(SearchableRecordType::Knowledge),
            "task" => Ok(SearchableRecordType::Task),
            "change_task" => Ok(SearchableRecordType::ChangeTask),
            "cert_follow_on_task" => Ok(SearchableRecordType::FollowOnTask),
            other => other
                .parse::<RecordType>()
                .map(SearchableRecordType::Subscribable)
                .map_err(|_| UnknownVariant::new("record type", other)),
        }
    }
}

// ─── Events ──────────────────────────────────────────────────

/// Record changes a subscription can be notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionEvent {
    Created,
    Priority,
    State,
    Commented,
    AssignedTo,
    AssignmentGroup,
}

impl SubscriptionEvent {
    pub const ALL: [SubscriptionEvent; 6] = [
        SubscriptionEvent::Created,
        SubscriptionEvent::Priority,
        SubscriptionEvent::State,
        SubscriptionEvent::Commented,
        SubscriptionEvent::AssignedTo,
        SubscriptionEvent::AssignmentGroup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionEvent::Created => "created",
            SubscriptionEvent::Priority => "priority",
            SubscriptionEvent::State => "state",
            SubscriptionEvent::Commented => "commented",
            SubscriptionEvent::AssignedTo => "assigned_to",
            SubscriptionEvent::AssignmentGroup => "assignment_group",
        }
    }

    /// Label shown in notifications.
    pub fn label(self) -> &'static str {
        match self {
            SubscriptionEvent::Created => "New record created",
            SubscriptionEvent::Priority => "Priority changed",
            SubscriptionEvent::State => "State changed",
            SubscriptionEvent::Commented => "New comment",
            SubscriptionEvent::AssignedTo => "Assigned to changed",
            SubscriptionEvent::AssignmentGroup => "Assignment group changed",
        }
    }

    /// Label for a raw event key; unknown keys get an empty label.
    pub fn label_for(key: &str) -> &'static str {
        key.parse::<SubscriptionEvent>()
            .map(SubscriptionEvent::label)
            .unwrap_or("")
    }

    /// Parse a comma-joined event list. Blank entries are ignored.
    pub fn parse_list(events: &str) -> Result<Vec<SubscriptionEvent>, UnknownVariant> {
        events
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for SubscriptionEvent {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("subscription event", s))
    }
}

// ─── Wire models ─────────────────────────────────────────────

/// Subscription as written to ServiceNow (create and edit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPayload {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(rename = "type", default)]
    pub subscription_type: String,
    #[serde(default)]
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// Comma-joined event names
    #[serde(default)]
    pub subscription_events: String,
    #[serde(default)]
    pub server_url: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

/// Validated view of a [`SubscriptionPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionKey<'a> {
    pub channel_id: &'a str,
    pub subscription_type: SubscriptionType,
    pub record_type: RecordType,
    /// Present iff the subscription type is `Record`.
    pub record_id: Option<&'a str>,
    pub server_url: &'a str,
}

impl SubscriptionPayload {
    /// Check the payload invariants and return the duplicate-check key.
    pub fn validate(&self) -> Result<SubscriptionKey<'_>, String> {
        if self.channel_id.trim().is_empty() {
            return Err("channel ID should not be empty".to_string());
        }
        if self.server_url.trim().is_empty() {
            return Err("server URL should not be empty".to_string());
        }

        let subscription_type: SubscriptionType = self
            .subscription_type
            .parse()
            .map_err(|e: UnknownVariant| e.to_string())?;
        let record_type: RecordType = self
            .record_type
            .parse()
            .map_err(|e: UnknownVariant| e.to_string())?;

        let record_id = self.record_id.as_deref().filter(|id| !id.trim().is_empty());
        match (subscription_type, record_id) {
            (SubscriptionType::Record, None) => {
                return Err("record ID should not be empty for record subscriptions".to_string())
            }
            (SubscriptionType::Bulk, Some(_)) => {
                return Err("record ID is not allowed for bulk subscriptions".to_string())
            }
            _ => {}
        }

        let events = SubscriptionEvent::parse_list(&self.subscription_events)
            .map_err(|e| e.to_string())?;
        if events.is_empty() {
            return Err("at least one subscription event is required".to_string());
        }

        Ok(SubscriptionKey {
            channel_id: &self.channel_id,
            subscription_type,
            record_type,
            record_id,
            server_url: &self.server_url,
        })
    }
}

/// Subscription as read back from ServiceNow, with the record summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub sys_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(rename = "type", default)]
    pub subscription_type: String,
    #[serde(default)]
    pub record_type: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub subscription_events: String,
    #[serde(default)]
    pub server_url: String,
    /// ServiceNow returns booleans as strings ("true"/"false")
    #[serde(default)]
    pub is_active: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub short_description: String,
}
