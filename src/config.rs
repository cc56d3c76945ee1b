// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! On Cloud Run, secrets are injected as environment variables via secret
//! bindings, so everything is read from the process environment.

use std::env;
use std::net::IpAddr;

/// Which user store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStoreKind {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public, also the expected ID token audience)
    pub google_client_id: String,
    /// Frontend URL hosting the static pages (features.html etc.)
    pub frontend_url: String,
    /// Public URL of this service, used to build the OAuth callback URL
    pub api_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Explicit `Domain` for the session marker cookie (COOKIE_DOMAIN)
    pub cookie_domain: Option<String>,
    /// Backend for user records
    pub user_store: UserStoreKind,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth state parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            cookie_domain: None,
            user_store: UserStoreKind::Memory,
            port: 8080,
            google_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let jwt_signing_key = signing_key(
            "JWT_SIGNING_KEY",
            env::var("JWT_SIGNING_KEY").map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?,
        )?;

        let oauth_state_key = match env::var("OAUTH_STATE_KEY") {
            Ok(v) => signing_key("OAUTH_STATE_KEY", v)?,
            Err(_) => jwt_signing_key.clone(),
        };

        let user_store = match env::var("USER_STORE").as_deref() {
            Ok("memory") => UserStoreKind::Memory,
            Ok("firestore") | Err(_) => UserStoreKind::Firestore,
            Ok(other) => return Err(ConfigError::Invalid("USER_STORE", other.to_string())),
        };

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            cookie_domain: env::var("COOKIE_DOMAIN")
                .ok()
                .map(|v| v.trim().trim_start_matches('.').to_string())
                .filter(|v| !v.is_empty()),
            user_store,
            port,

            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            jwt_signing_key,
            oauth_state_key,
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }

    /// `Domain` attribute for the marker cookie so frontend pages on a
    /// sibling host can read it.
    ///
    /// COOKIE_DOMAIN wins; otherwise the parent domain of the frontend host
    /// (`app.example.com` -> `example.com`). Localhost and IP hosts get no
    /// `Domain`, so the cookie stays host-only.
    pub fn marker_cookie_domain(&self) -> Option<String> {
        if let Some(domain) = &self.cookie_domain {
            return Some(domain.clone());
        }

        let url = reqwest::Url::parse(&self.frontend_url).ok()?;
        let host = url.host_str()?;
        if host == "localhost" || host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return None;
        }
        Some(labels[labels.len() - 2..].join("."))
    }
}

/// Reject empty keys: an empty HMAC key makes every token forgeable.
fn signing_key(name: &'static str, value: String) -> Result<Vec<u8>, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(name, "must not be empty".to_string()));
    }
    Ok(trimmed.as_bytes().to_vec())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
