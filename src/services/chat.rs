// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Posting notifications into Mattermost channels.

use crate::error::AppError;
use crate::models::Attachment;
use async_trait::async_trait;

#[async_trait]
pub trait ChatPoster: Send + Sync {
    /// Post `attachment` into `channel_id` as the user `bot_id`.
    async fn post_message(
        &self,
        channel_id: &str,
        bot_id: &str,
        attachment: &Attachment,
    ) -> Result<(), AppError>;
}

/// Posts through the Mattermost REST API with a bot access token.
#[derive(Clone)]
pub struct MattermostPoster {
    http: reqwest::Client,
    site_url: String,
    bot_access_token: String,
}

impl MattermostPoster {
    pub fn new(site_url: &str, bot_access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            site_url: site_url.trim_end_matches('/').to_string(),
            bot_access_token,
        }
    }
}

#[async_trait]
impl ChatPoster for MattermostPoster {
    async fn post_message(
        &self,
        channel_id: &str,
        bot_id: &str,
        attachment: &Attachment,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "channel_id": channel_id,
            "user_id": bot_id,
            "message": "",
            "props": { "attachments": [attachment] },
        });

        let response = self
            .http
            .post(format!("{}/api/v4/posts", self.site_url))
            .bearer_auth(&self.bot_access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Chat(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Chat(format!("HTTP {}: {}", status, body)));
        }

        Ok(())
    }
}
