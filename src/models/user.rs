// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connected user model for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Mattermost user who has connected a ServiceNow account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Mattermost user ID (also used as the store key)
    pub mattermost_user_id: String,
    /// Encrypted [`OAuthToken`] JSON (base64)
    pub oauth2_token: String,
}

/// ServiceNow OAuth token, as held in memory after decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    /// When the access token expires
    pub expiry: Option<DateTime<Utc>>,
}
