// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 / OpenID Connect identity provider.
//!
//! Handles:
//! - Building the consent-screen URL
//! - Exchanging the authorization code at the token endpoint
//! - Verifying the returned ID token

use crate::error::AppError;
use crate::services::google_oidc::{GoogleIdTokenVerifier, IdTokenError};
use crate::services::identity::{AuthenticatedUser, IdentityProvider};
use async_trait::async_trait;
use serde::Deserialize;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str = "openid email profile";

/// Google sign-in client.
pub struct GoogleIdentityProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    verifier: GoogleIdTokenVerifier,
}

impl GoogleIdentityProvider {
    /// Create a provider with OAuth credentials and an ID token verifier.
    pub fn new(client_id: String, client_secret: String, verifier: GoogleIdTokenVerifier) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            verifier,
        }
    }

    async fn request_tokens(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Token exchange failed: HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             prompt=select_account&\
             state={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SCOPES),
            state
        )
    }

    async fn exchange_credential(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthenticatedUser, AppError> {
        let tokens = self.request_tokens(code, redirect_uri).await?;

        let identity = self
            .verifier
            .verify_id_token(&tokens.id_token)
            .await
            .map_err(|e| match e {
                IdTokenError::Rejected(msg) => {
                    AppError::IdentityProvider(format!("ID token rejected: {}", msg))
                }
                IdTokenError::Transient(msg) => AppError::IdentityProvider(msg),
            })?;

        Ok(AuthenticatedUser {
            uid: identity.subject,
            display_name: identity.name,
            email: identity.email,
        })
    }
}

/// Token endpoint response. Only the ID token is used.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
}
