// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Study Buddy sign-in service.
//!
//! Handles "Sign in with Google" for the Study Buddy pages: delegates the
//! credential exchange to Google, makes sure a Firestore user record exists,
//! then persists a session marker and redirects to the features page.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

use config::Config;
use services::SignInService;

/// Page every successful sign-in (and every already-active session) lands on.
pub const FOLLOW_UP_PAGE: &str = "features.html";

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sign_in: SignInService,
}

impl AppState {
    /// Absolute URL of the follow-up page on the frontend.
    pub fn follow_up_url(&self) -> String {
        format!("{}/{}", self.config.frontend_url, FOLLOW_UP_PAGE)
    }

    /// OAuth redirect URI registered with the identity provider.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/google/callback", self.config.api_url)
    }
}
