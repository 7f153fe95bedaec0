// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only projections of ServiceNow records.

use serde::{Deserialize, Deserializer, Serialize};

/// ServiceNow table API envelope: every response is wrapped in `result`.
#[derive(Debug, Deserialize)]
pub struct TableResponse<T> {
    pub result: T,
}

/// Search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNowPartialRecord {
    pub sys_id: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub short_description: String,
}

/// Full record, fetched with `sysparm_display_value=true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNowRecord {
    pub sys_id: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default, deserialize_with = "display_value")]
    pub state: String,
    #[serde(default, deserialize_with = "display_value")]
    pub priority: String,
    #[serde(default, deserialize_with = "display_value")]
    pub assigned_to: String,
    #[serde(default, deserialize_with = "display_value")]
    pub assignment_group: String,
}

/// Reference fields come back as `{"display_value": .., "link": ..}` when set
/// and as a bare (usually empty) string otherwise.
fn display_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Plain(String),
        Reference {
            #[serde(default)]
            display_value: String,
        },
        Null(()),
    }

    Ok(match Field::deserialize(deserializer)? {
        Field::Plain(value) => value,
        Field::Reference { display_value } => display_value,
        Field::Null(()) => String::new(),
    })
}
