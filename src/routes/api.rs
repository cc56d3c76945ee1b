// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session API for the frontend pages.

use axum::{routing::get, Extension, Json, Router};
use std::sync::Arc;

use crate::middleware::AuthSession;
use crate::models::SessionMarker;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/session", get(get_session))
}

/// Identity of the signed-in user.
async fn get_session(Extension(AuthSession(claims)): Extension<AuthSession>) -> Json<SessionMarker> {
    Json(claims.marker())
}
