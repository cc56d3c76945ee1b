// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login page with ambient session redirect.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::session::current_session;
use crate::AppState;

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Study Buddy - Sign in</title>
</head>
<body>
  <main>
    <h1>Study Buddy</h1>
    <a id="googleSignIn" href="/auth/google">Sign in with Google</a>
  </main>
</body>
</html>
"#;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(login_page))
        .route("/login", get(login_page))
}

/// Redirect straight to the follow-up page when a session is already
/// active, otherwise show the sign-in trigger. Never touches the user store.
async fn login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(claims) = current_session(&jar, &state.config.jwt_signing_key) {
        tracing::debug!(uid = %claims.sub, "Session already active, redirecting");
        return Redirect::to(&state.follow_up_url()).into_response();
    }

    Html(LOGIN_PAGE).into_response()
}
