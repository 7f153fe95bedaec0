// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process [`Store`] backed by concurrent maps.

use super::{Store, OAUTH_STATE_TTL_SECS};
use crate::constants;
use crate::error::AppError;
use crate::models::User;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};

#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<String, User>,
    /// Pending OAuth state -> expiry
    oauth_states: DashMap<String, DateTime<Utc>>,
    activated_servers: DashSet<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Servers with activated subscriptions, in no particular order.
    pub fn activated_servers(&self) -> Vec<String> {
        self.activated_servers.iter().map(|s| s.key().clone()).collect()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load_user(&self, mattermost_user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .get(mattermost_user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn store_user(&self, user: &User) -> Result<(), AppError> {
        self.users
            .insert(user.mattermost_user_id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, mattermost_user_id: &str) -> Result<(), AppError> {
        self.users.remove(mattermost_user_id);
        Ok(())
    }

    async fn get_all_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn store_oauth2_state(&self, state: &str) -> Result<(), AppError> {
        let now = Utc::now();
        // Abandoned connect attempts are dropped here.
        self.oauth_states.retain(|_, expires_at| *expires_at > now);
        self.oauth_states.insert(
            state.to_string(),
            now + Duration::seconds(OAUTH_STATE_TTL_SECS),
        );
        Ok(())
    }

    async fn verify_oauth2_state(&self, state: &str) -> Result<(), AppError> {
        match self.oauth_states.remove(state) {
            Some((_, expires_at)) if Utc::now() < expires_at => Ok(()),
            _ => Err(AppError::Forbidden(
                constants::ERROR_OAUTH_STATE_EXPIRED.to_string(),
            )),
        }
    }

    async fn delete_user_token_on_encryption_secret_change(&self) -> Result<(), AppError> {
        let count = self.users.len();
        self.users.clear();
        tracing::info!(count, "Deleted user tokens after encryption secret change");
        Ok(())
    }

    async fn subscriptions_activated(&self, server_url: &str) -> Result<bool, AppError> {
        Ok(self.activated_servers.contains(server_url))
    }

    async fn mark_subscriptions_activated(&self, server_url: &str) -> Result<(), AppError> {
        self.activated_servers.insert(server_url.to_string());
        Ok(())
    }
}
