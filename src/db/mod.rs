// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store.
//!
//! The bridge only needs a small key-value contract, keyed by Mattermost user
//! ID. [`FileStore`] keeps users and activated servers across restarts;
//! [`InMemoryStore`] serves throwaway deployments and tests.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::InMemoryStore;

use crate::error::AppError;
use crate::models::User;
use async_trait::async_trait;

/// How long a pending OAuth state stays valid.
pub const OAUTH_STATE_TTL_SECS: i64 = 15 * 60;

#[async_trait]
pub trait Store: Send + Sync {
    /// Load a connected user, or `None` if the user never connected.
    async fn load_user(&self, mattermost_user_id: &str) -> Result<Option<User>, AppError>;

    /// Create or replace a user (last write wins).
    async fn store_user(&self, user: &User) -> Result<(), AppError>;

    async fn delete_user(&self, mattermost_user_id: &str) -> Result<(), AppError>;

    async fn get_all_users(&self) -> Result<Vec<User>, AppError>;

    /// Remember a pending OAuth state for [`OAUTH_STATE_TTL_SECS`].
    async fn store_oauth2_state(&self, state: &str) -> Result<(), AppError>;

    /// Consume a pending OAuth state. Fails if it is unknown or expired.
    async fn verify_oauth2_state(&self, state: &str) -> Result<(), AppError>;

    /// Drop every stored token; they can no longer be decrypted.
    async fn delete_user_token_on_encryption_secret_change(&self) -> Result<(), AppError>;

    /// Whether subscriptions were activated for this ServiceNow server.
    async fn subscriptions_activated(&self, server_url: &str) -> Result<bool, AppError>;

    async fn mark_subscriptions_activated(&self, server_url: &str) -> Result<(), AppError>;
}
