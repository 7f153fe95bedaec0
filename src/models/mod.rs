// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod event;
pub mod post;
pub mod record;
pub mod subscription;
pub mod user;

pub use event::ServiceNowEvent;
pub use post::{Attachment, AttachmentField};
pub use record::{ServiceNowPartialRecord, ServiceNowRecord, TableResponse};
pub use subscription::{
    RecordType, SearchableRecordType, SubscriptionEvent, SubscriptionPayload,
    SubscriptionResponse, SubscriptionType,
};
pub use user::{OAuthToken, User};
