// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Browser-side session persistence.
//!
//! Two cookies are written after a successful sign-in:
//! - `user`: percent-encoded JSON `{uid, name}`, readable by page scripts
//! - `study_buddy_session`: HttpOnly HS256 JWT holding the ambient auth state

use crate::models::SessionMarker;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MARKER_COOKIE: &str = "user";
pub const SESSION_COOKIE: &str = "study_buddy_session";
pub const NONCE_COOKIE: &str = "study_buddy_oauth_nonce";
pub const NONCE_COOKIE_PATH: &str = "/auth/google/callback";

const SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60; // 30 days
const NONCE_TTL_MINUTES: i64 = 10;

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (provider uid)
    pub sub: String,
    /// Display name at sign-in time
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

impl SessionClaims {
    pub fn marker(&self) -> SessionMarker {
        SessionMarker {
            uid: self.sub.clone(),
            name: self.name.clone(),
        }
    }
}

/// Create a signed session token for `marker`.
pub fn create_session_token(marker: &SessionMarker, signing_key: &[u8]) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let claims = SessionClaims {
        sub: marker.uid.clone(),
        name: marker.name.clone(),
        iat: now as usize,
        exp: (now + SESSION_TTL_SECS) as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Decode and validate a session token. Expired or tampered tokens yield `None`.
pub fn decode_session_token(token: &str, signing_key: &[u8]) -> Option<SessionClaims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .ok()
}

/// Current session from the request cookies, if any.
pub fn current_session(jar: &CookieJar, signing_key: &[u8]) -> Option<SessionClaims> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| decode_session_token(cookie.value(), signing_key))
}

/// Read the session marker cookie.
pub fn read_marker(jar: &CookieJar) -> Option<SessionMarker> {
    let raw = jar.get(MARKER_COOKIE)?;
    let json = urlencoding::decode(raw.value()).ok()?;
    SessionMarker::from_json(&json).ok()
}

/// Attach the marker and session cookies to the jar.
///
/// `marker_domain` only applies to the marker; the session cookie stays
/// host-only on the API.
pub fn persist_session(
    jar: CookieJar,
    marker: &SessionMarker,
    signing_key: &[u8],
    secure: bool,
    marker_domain: Option<&str>,
) -> anyhow::Result<CookieJar> {
    let token = create_session_token(marker, signing_key)?;
    let marker_value = urlencoding::encode(&marker.to_json()?).into_owned();

    let mut marker_cookie = Cookie::build((MARKER_COOKIE, marker_value))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .permanent();
    if let Some(domain) = marker_domain {
        marker_cookie = marker_cookie.domain(domain.to_string());
    }

    let session_cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64));

    Ok(jar.add(marker_cookie).add(session_cookie))
}

/// Cookie binding the OAuth state to this browser.
pub fn nonce_cookie(nonce: String, secure: bool) -> Cookie<'static> {
    Cookie::build((NONCE_COOKIE, nonce))
        .path(NONCE_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::minutes(NONCE_TTL_MINUTES))
        .build()
}

/// Remove the one-shot nonce cookie.
pub fn clear_nonce(jar: CookieJar, secure: bool) -> CookieJar {
    jar.remove(
        Cookie::build(NONCE_COOKIE)
            .path(NONCE_COOKIE_PATH)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure),
    )
}

/// Remove every cookie this service sets.
///
/// Only cookies the browser actually sent are removed, so a cross-site
/// POST (which carries no SameSite=Lax cookies) clears nothing.
pub fn clear_session(jar: CookieJar, secure: bool, marker_domain: Option<&str>) -> CookieJar {
    let mut marker_cookie = Cookie::build(MARKER_COOKIE)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure);
    if let Some(domain) = marker_domain {
        marker_cookie = marker_cookie.domain(domain.to_string());
    }

    let jar = jar
        .remove(marker_cookie)
        .remove(
            Cookie::build(SESSION_COOKIE)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(secure),
        );
    clear_nonce(jar, secure)
}
