// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ServiceNow bridge: ServiceNow record subscriptions and change notifications
//! for Mattermost channels.
//!
//! Users connect their ServiceNow account over OAuth, then manage
//! subscriptions through the `/api/v1` endpoints. ServiceNow calls back into
//! `/api/v1/notification` when a subscribed record changes and the bridge
//! posts the change into the subscribed channel as the bot user.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Store;
use services::{
    ChatPoster, EventNotifier, HttpTransport, OAuthProvider, ServiceNowClient,
    SubscriptionRegistry, TokenCipher,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub transport: Arc<dyn HttpTransport>,
    pub chat: Arc<dyn ChatPoster>,
    pub cipher: TokenCipher,
    pub oauth: Arc<dyn OAuthProvider>,
}

impl AppState {
    /// ServiceNow client acting with `access_token`.
    pub fn servicenow_client(&self, access_token: &str) -> ServiceNowClient {
        ServiceNowClient::new(self.transport.clone(), access_token)
    }

    pub fn registry(&self, access_token: &str) -> SubscriptionRegistry {
        SubscriptionRegistry::new(
            self.servicenow_client(access_token),
            self.store.clone(),
            &self.config.servicenow_url,
        )
    }

    pub fn notifier(&self) -> EventNotifier {
        EventNotifier::new(
            self.chat.clone(),
            &self.config.bot_user_id,
            &self.config.servicenow_url,
        )
    }
}
