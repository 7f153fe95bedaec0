// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat message attachments (Mattermost's Slack-compatible format).

use serde::{Deserialize, Serialize};

/// Structured attachment rendered under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Markdown title line
    pub title: String,
    pub fields: Vec<AttachmentField>,
}

/// One titled value in an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    /// Render side by side with the neighbouring short field
    pub short: bool,
}

impl Attachment {
    /// Value of the first field with the given title.
    pub fn field(&self, title: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.title == title)
            .map(|f| f.value.as_str())
    }
}

impl AttachmentField {
    pub fn short(title: &str, value: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            value: value.into(),
            short: true,
        }
    }
}
