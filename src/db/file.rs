// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! [`Store`] persisted to a JSON file.
//!
//! Reads are served from memory. Every write to users or activated servers
//! rewrites the whole file through a temporary sibling and a rename, so a
//! crash leaves either the old or the new snapshot on disk. Pending OAuth
//! states are short-lived and stay in memory only.

use super::{InMemoryStore, Store};
use crate::error::AppError;
use crate::models::User;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    activated_servers: Vec<String>,
}

pub struct FileStore {
    path: PathBuf,
    memory: InMemoryStore,
    /// Serializes snapshot writes
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading any existing snapshot. A missing
    /// file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let memory = InMemoryStore::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::Store(format!("failed to parse {}: {}", path.display(), e))
                })?;
                for user in &snapshot.users {
                    memory.store_user(user).await?;
                }
                for server_url in &snapshot.activated_servers {
                    memory.mark_subscriptions_activated(server_url).await?;
                }
                tracing::info!(
                    path = %path.display(),
                    users = snapshot.users.len(),
                    "Loaded credential store"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Starting new credential store");
            }
            Err(e) => return Err(io_error(&path, e)),
        }

        Ok(Self {
            path,
            memory,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;

        let mut users = self.memory.get_all_users().await?;
        users.sort_by(|a, b| a.mattermost_user_id.cmp(&b.mattermost_user_id));
        let mut activated_servers = self.memory.activated_servers();
        activated_servers.sort();

        let bytes = serde_json::to_vec_pretty(&Snapshot {
            users,
            activated_servers,
        })
        .map_err(|e| AppError::Store(format!("failed to encode store: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> AppError {
    AppError::Store(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl Store for FileStore {
    async fn load_user(&self, mattermost_user_id: &str) -> Result<Option<User>, AppError> {
        self.memory.load_user(mattermost_user_id).await
    }

    async fn store_user(&self, user: &User) -> Result<(), AppError> {
        self.memory.store_user(user).await?;
        self.persist().await
    }

    async fn delete_user(&self, mattermost_user_id: &str) -> Result<(), AppError> {
        self.memory.delete_user(mattermost_user_id).await?;
        self.persist().await
    }

    async fn get_all_users(&self) -> Result<Vec<User>, AppError> {
        self.memory.get_all_users().await
    }

    async fn store_oauth2_state(&self, state: &str) -> Result<(), AppError> {
        self.memory.store_oauth2_state(state).await
    }

    async fn verify_oauth2_state(&self, state: &str) -> Result<(), AppError> {
        self.memory.verify_oauth2_state(state).await
    }

    async fn delete_user_token_on_encryption_secret_change(&self) -> Result<(), AppError> {
        self.memory
            .delete_user_token_on_encryption_secret_change()
            .await?;
        self.persist().await
    }

    async fn subscriptions_activated(&self, server_url: &str) -> Result<bool, AppError> {
        self.memory.subscriptions_activated(server_url).await
    }

    async fn mark_subscriptions_activated(&self, server_url: &str) -> Result<(), AppError> {
        self.memory.mark_subscriptions_activated(server_url).await?;
        self.persist().await
    }
}
