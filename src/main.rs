// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ServiceNow bridge API server.
//!
//! Manages ServiceNow record subscriptions for Mattermost channels and relays
//! ServiceNow change events into those channels.

use servicenow_bridge::{
    config::Config,
    db::{FileStore, InMemoryStore, Store},
    services::{
        crypto::purge_tokens_after_secret_change, MattermostPoster, ReqwestTransport,
        ServiceNowOAuth, TokenCipher,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        servicenow_url = %config.servicenow_url,
        "Starting ServiceNow bridge"
    );

    let cipher = TokenCipher::new(&config.encryption_secret)?;
    let store: Arc<dyn Store> = match &config.store_path {
        Some(path) => Arc::new(FileStore::open(path).await?),
        None => {
            tracing::warn!("STORE_PATH not set; connected users are lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };
    purge_tokens_after_secret_change(store.as_ref(), &cipher).await?;

    let state = Arc::new(AppState {
        transport: Arc::new(ReqwestTransport::new(&config.servicenow_url)),
        chat: Arc::new(MattermostPoster::new(
            &config.mattermost_url,
            config.bot_access_token.clone(),
        )),
        oauth: Arc::new(ServiceNowOAuth::new(&config)),
        store,
        cipher,
        config: config.clone(),
    });

    // Build router
    let app = servicenow_bridge::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("servicenow_bridge=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
