// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider abstraction.

use crate::error::AppError;
use async_trait::async_trait;

/// User handle returned by a successful credential exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Provider-assigned unique id
    pub uid: String,
    pub display_name: String,
    pub email: String,
}

/// External service that authenticates users via a redirect flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to in order to start the exchange.
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange the authorization code for the authenticated user.
    async fn exchange_credential(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthenticatedUser, AppError>;
}
