// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::session::{current_session, decode_session_token, SessionClaims};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Authenticated session extracted from the session JWT.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionClaims);

/// Middleware that requires a valid session.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let key = &state.config.jwt_signing_key;

    // Try cookie first, then header
    let claims = match current_session(&jar, key) {
        Some(claims) => claims,
        None => {
            let token = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or(StatusCode::UNAUTHORIZED)?;

            decode_session_token(token, key).ok_or(StatusCode::UNAUTHORIZED)?
        }
    };

    request.extensions_mut().insert(AuthSession(claims));

    Ok(next.run(request).await)
}
