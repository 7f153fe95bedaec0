// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// ServiceNow instance base URL, without trailing slash
    pub servicenow_url: String,
    /// ServiceNow OAuth client ID
    pub servicenow_client_id: String,
    /// Mattermost site URL (used for posting as the bot)
    pub mattermost_url: String,
    /// Public URL this bridge is reachable at (OAuth redirect base)
    pub plugin_url: String,
    /// Bot user ID that notifications are posted as
    pub bot_user_id: String,
    /// Server port
    pub port: u16,
    /// JSON file for connected users; in-memory only when unset
    pub store_path: Option<PathBuf>,

    // --- Secrets ---
    /// ServiceNow OAuth client secret
    pub servicenow_client_secret: String,
    /// Secret from which the token encryption key is derived
    pub encryption_secret: String,
    /// Shared secret ServiceNow sends with every notification
    pub webhook_secret: String,
    /// Mattermost bot access token
    pub bot_access_token: String,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            servicenow_url: "https://test.service-now.com".to_string(),
            servicenow_client_id: "test_client_id".to_string(),
            mattermost_url: "http://localhost:8065".to_string(),
            plugin_url: "http://localhost:8080".to_string(),
            bot_user_id: "test_bot_user_id".to_string(),
            port: 8080,
            store_path: None,
            servicenow_client_secret: "test_secret".to_string(),
            encryption_secret: "test_encryption_secret_32_bytes!".to_string(),
            webhook_secret: "test_webhook_secret".to_string(),
            bot_access_token: "test_bot_token".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let config = Self {
            servicenow_url: required("SERVICENOW_URL")?
                .trim_end_matches('/')
                .to_string(),
            servicenow_client_id: required("SERVICENOW_CLIENT_ID")?,
            mattermost_url: required("MATTERMOST_URL")?
                .trim_end_matches('/')
                .to_string(),
            plugin_url: env::var("PLUGIN_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            bot_user_id: required("BOT_USER_ID")?,
            port,
            store_path: env::var("STORE_PATH")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            servicenow_client_secret: required("SERVICENOW_CLIENT_SECRET")?,
            encryption_secret: required("ENCRYPTION_SECRET")?,
            webhook_secret: required("WEBHOOK_SECRET")?,
            bot_access_token: required("BOT_ACCESS_TOKEN")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject blank values for the settings the bridge cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (&self.servicenow_url, ConfigError::EMPTY_SERVICENOW_URL),
            (&self.servicenow_client_id, ConfigError::EMPTY_CLIENT_ID),
            (&self.servicenow_client_secret, ConfigError::EMPTY_CLIENT_SECRET),
            (&self.encryption_secret, ConfigError::EMPTY_ENCRYPTION_SECRET),
            (&self.webhook_secret, ConfigError::EMPTY_WEBHOOK_SECRET),
        ];

        for (value, message) in checks {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(message));
            }
        }
        Ok(())
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("{0}")]
    Invalid(&'static str),
}

impl ConfigError {
    pub const EMPTY_SERVICENOW_URL: &'static str = "serviceNow server URL should not be empty";
    pub const EMPTY_CLIENT_ID: &'static str = "serviceNow OAuth clientID should not be empty";
    pub const EMPTY_CLIENT_SECRET: &'static str =
        "serviceNow OAuth clientSecret should not be empty";
    pub const EMPTY_ENCRYPTION_SECRET: &'static str = "encryption secret should not be empty";
    pub const EMPTY_WEBHOOK_SECRET: &'static str = "webhook secret should not be empty";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("SERVICENOW_URL", "https://dev.service-now.com/");
        env::set_var("SERVICENOW_CLIENT_ID", "test_id");
        env::set_var("SERVICENOW_CLIENT_SECRET", "test_secret");
        env::set_var("ENCRYPTION_SECRET", "enc");
        env::set_var("WEBHOOK_SECRET", "hook");
        env::set_var("MATTERMOST_URL", "http://mm.local");
        env::set_var("BOT_ACCESS_TOKEN", "bot-token");
        env::set_var("BOT_USER_ID", "bot-id");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.servicenow_url, "https://dev.service-now.com");
        assert_eq!(config.servicenow_client_id, "test_id");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_validate_rejects_blank_webhook_secret() {
        let mut config = Config::test_default();
        config.webhook_secret = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "webhook secret should not be empty");
    }
}
