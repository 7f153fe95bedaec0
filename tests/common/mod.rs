// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Method;
use servicenow_bridge::config::Config;
use servicenow_bridge::db::{InMemoryStore, Store};
use servicenow_bridge::error::AppError;
use servicenow_bridge::models::{Attachment, OAuthToken, User};
use servicenow_bridge::routes::create_router;
use servicenow_bridge::services::crypto::{decrypt_token, encrypt_token};
use servicenow_bridge::services::transport::{
    HttpTransport, RemoteRequest, RemoteResponse, TransportError,
};
use servicenow_bridge::services::{ChatPoster, OAuthProvider, TokenCipher};
use servicenow_bridge::AppState;
use std::sync::{Arc, Mutex};

#[allow(dead_code)]
pub const TEST_USER_ID: &str = "mm_user_1";

type Responder =
    dyn Fn(&RemoteRequest) -> Result<(StatusCode, serde_json::Value), TransportError> + Send + Sync;

/// ServiceNow stand-in: records requests, answers from a closure.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<RemoteRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RemoteRequest) -> Result<(StatusCode, serde_json::Value), TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// GETs see `existing` as the result list; writes succeed with 200.
    pub fn with_existing(existing: serde_json::Value) -> Self {
        Self::new(move |request| {
            if request.method == Method::GET {
                Ok((StatusCode::OK, serde_json::json!({ "result": existing.clone() })))
            } else {
                Ok((StatusCode::OK, serde_json::json!({ "result": {} })))
            }
        })
    }

    pub fn failing(status: StatusCode, message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| {
            Err(TransportError {
                status,
                message: message.clone(),
            })
        })
    }

    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &Method) -> usize {
        self.requests()
            .iter()
            .filter(|r| &r.method == method)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn call_json(
        &self,
        _access_token: &str,
        request: RemoteRequest,
    ) -> Result<RemoteResponse, TransportError> {
        let result = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        result.map(|(status, body)| RemoteResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        })
    }
}

/// Chat stand-in that keeps every post.
#[derive(Default)]
pub struct RecordingChatPoster {
    pub posts: Mutex<Vec<(String, String, Attachment)>>,
}

#[async_trait]
impl ChatPoster for RecordingChatPoster {
    async fn post_message(
        &self,
        channel_id: &str,
        bot_id: &str,
        attachment: &Attachment,
    ) -> Result<(), AppError> {
        self.posts.lock().unwrap().push((
            channel_id.to_string(),
            bot_id.to_string(),
            attachment.clone(),
        ));
        Ok(())
    }
}

/// Token endpoint stand-in. Hands out `issued` for every grant, or fails
/// when nothing is set.
#[derive(Default)]
pub struct StubOAuth {
    pub issued: Mutex<Option<OAuthToken>>,
    pub codes: Mutex<Vec<String>>,
    pub refreshes: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StubOAuth {
    pub fn issue(&self, token: OAuthToken) {
        *self.issued.lock().unwrap() = Some(token);
    }

    fn grant(&self) -> Result<OAuthToken, AppError> {
        self.issued
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::ServiceNow {
                status: StatusCode::BAD_REQUEST,
                message: "token request failed with status 400 Bad Request".to_string(),
            })
    }
}

#[async_trait]
impl OAuthProvider for StubOAuth {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "https://test.service-now.com/oauth_auth.do?response_type=code&state={}",
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AppError> {
        self.codes.lock().unwrap().push(code.to_string());
        self.grant()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthToken, AppError> {
        self.refreshes.lock().unwrap().push(refresh_token.to_string());
        self.grant()
    }
}

/// Bearer token with the given values.
#[allow(dead_code)]
pub fn token(
    access_token: &str,
    refresh_token: &str,
    expiry: Option<chrono::DateTime<chrono::Utc>>,
) -> OAuthToken {
    OAuthToken {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        token_type: "Bearer".to_string(),
        expiry,
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub transport: Arc<ScriptedTransport>,
    pub chat: Arc<RecordingChatPoster>,
    pub oauth: Arc<StubOAuth>,
}

#[allow(dead_code)]
impl TestApp {
    /// Store a non-expiring encrypted token for `user_id`.
    pub async fn connect_user(&self, user_id: &str) {
        self.connect_user_with(user_id, &token(&format!("access-{}", user_id), "", None))
            .await;
    }

    pub async fn connect_user_with(&self, user_id: &str, token: &OAuthToken) {
        let user = User {
            mattermost_user_id: user_id.to_string(),
            oauth2_token: encrypt_token(&self.state.cipher, token, user_id).unwrap(),
        };
        self.state.store.store_user(&user).await.unwrap();
    }

    /// Decrypted token currently stored for `user_id`.
    pub async fn stored_token(&self, user_id: &str) -> Option<OAuthToken> {
        let user = self.state.store.load_user(user_id).await.unwrap()?;
        Some(decrypt_token(&self.state.cipher, &user.oauth2_token, user_id).unwrap())
    }

    pub async fn activate_subscriptions(&self) {
        self.state
            .store
            .mark_subscriptions_activated(&self.state.config.servicenow_url)
            .await
            .unwrap();
    }

    pub fn posts(&self) -> Vec<(String, String, Attachment)> {
        self.chat.posts.lock().unwrap().clone()
    }
}

/// Create a test app around the given ServiceNow stand-in.
#[allow(dead_code)]
pub fn create_test_app(transport: ScriptedTransport) -> TestApp {
    let config = Config::test_default();
    let transport = Arc::new(transport);
    let chat = Arc::new(RecordingChatPoster::default());
    let oauth = Arc::new(StubOAuth::default());
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

    let state = Arc::new(AppState {
        cipher: TokenCipher::new(&config.encryption_secret).unwrap(),
        oauth: oauth.clone(),
        transport: transport.clone(),
        chat: chat.clone(),
        store,
        config,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        transport,
        chat,
        oauth,
    }
}

/// Build a request, optionally as a Mattermost user, with an optional JSON body.
#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    user_id: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("Mattermost-User-Id", user_id);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
