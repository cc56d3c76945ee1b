// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in orchestration: credential exchange followed by user record setup.

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{SessionMarker, UserRecord};
use crate::services::identity::{AuthenticatedUser, IdentityProvider};
use std::sync::Arc;

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub user: AuthenticatedUser,
    /// True if this sign-in created the user's record.
    pub created: bool,
}

impl SignInOutcome {
    /// Session marker to persist in the browser.
    pub fn marker(&self) -> SessionMarker {
        SessionMarker {
            uid: self.user.uid.clone(),
            name: self.user.display_name.clone(),
        }
    }
}

/// Runs the credential exchange and ensures a user record exists.
#[derive(Clone)]
pub struct SignInService {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
}

impl SignInService {
    pub fn new(provider: Arc<dyn IdentityProvider>, users: Arc<dyn UserStore>) -> Self {
        Self { provider, users }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Exchange the authorization code, then create the user's record on
    /// first sign-in.
    ///
    /// The caller must only persist the session after this returns `Ok`.
    pub async fn sign_in(&self, code: &str, redirect_uri: &str) -> Result<SignInOutcome, AppError> {
        let user = self.provider.exchange_credential(code, redirect_uri).await?;
        let created = self.ensure_user_record(&user).await?;

        Ok(SignInOutcome { user, created })
    }

    /// Create the default record for `user` if none exists.
    ///
    /// Existing records are never touched so accumulated streak and points
    /// survive. Check-then-create is not atomic: two concurrent first
    /// sign-ins both write the defaults and the store keeps the last one.
    pub async fn ensure_user_record(&self, user: &AuthenticatedUser) -> Result<bool, AppError> {
        if self.users.get_record(&user.uid).await?.is_some() {
            tracing::info!(uid = %user.uid, "Returning user signed in");
            return Ok(false);
        }

        let record = UserRecord::new_default(&user.display_name, &user.email);
        self.users.put_record(&user.uid, &record).await?;

        tracing::info!(uid = %user.uid, "Created user record on first sign-in");
        Ok(true)
    }
}
