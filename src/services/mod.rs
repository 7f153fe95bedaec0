// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod chat;
pub mod crypto;
pub mod notifier;
pub mod oauth;
pub mod registry;
pub mod servicenow;
pub mod transport;

pub use chat::{ChatPoster, MattermostPoster};
pub use crypto::TokenCipher;
pub use notifier::EventNotifier;
pub use oauth::{OAuthProvider, ServiceNowOAuth};
pub use registry::{Pagination, SubscriptionFilter, SubscriptionRegistry};
pub use servicenow::ServiceNowClient;
pub use transport::{HttpTransport, ReqwestTransport};
