// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::session::{self, NONCE_COOKIE};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a started sign-in may take before the state is rejected.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;
const STATE_CLOCK_SKEW_MS: u128 = 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/logout", post(logout))
}

/// Start sign-in: bind a nonce to this browser, then redirect to Google.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let nonce = generate_nonce()?;
    let oauth_state = encode_state(&nonce, now_millis()?, &state.config.oauth_state_key)?;

    let auth_url = state
        .sign_in
        .provider()
        .authorization_url(&state.callback_url(), &oauth_state);

    tracing::info!("Starting sign-in, redirecting to identity provider");

    let jar = jar.add(session::nonce_cookie(nonce, state.config.secure_cookies()));
    Ok((jar, Redirect::temporary(&auth_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: exchange the code, ensure the user record, set the
/// session cookies and redirect to the follow-up page.
///
/// Any failure is logged and returned as an error response; no cookie is
/// set and no redirect happens.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    if let Some(error) = params.error {
        return Err(AppError::IdentityProvider(format!(
            "Sign-in was not completed: {}",
            error
        )));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;

    let nonce = verify_and_decode_state(&oauth_state, &state.config.oauth_state_key, now_millis()?)
        .ok_or_else(|| AppError::BadRequest("Invalid or expired state parameter".to_string()))?;

    let nonce_matches = jar
        .get(NONCE_COOKIE)
        .is_some_and(|cookie| bool::from(cookie.value().as_bytes().ct_eq(nonce.as_bytes())));
    if !nonce_matches {
        return Err(AppError::BadRequest(
            "State does not belong to this browser".to_string(),
        ));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code");

    let outcome = state.sign_in.sign_in(&code, &state.callback_url()).await?;

    // The store check/create has completed; only now is the session persisted.
    let secure = state.config.secure_cookies();
    let jar = session::clear_nonce(jar, secure);
    let jar = session::persist_session(
        jar,
        &outcome.marker(),
        &state.config.jwt_signing_key,
        secure,
        state.config.marker_cookie_domain().as_deref(),
    )?;

    tracing::info!(
        uid = %outcome.user.uid,
        created = outcome.created,
        "Sign-in successful, redirecting to follow-up page"
    );

    Ok((jar, Redirect::to(&state.follow_up_url())))
}

/// Sign out: drop the session cookies. The user record is kept.
///
/// POST only, so a cross-site link or image cannot sign the user out.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = session::clear_session(
        jar,
        state.config.secure_cookies(),
        state.config.marker_cookie_domain().as_deref(),
    );
    tracing::info!("Signed out");
    (jar, StatusCode::NO_CONTENT)
}

fn generate_nonce() -> Result<String> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(hex::encode(bytes))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

fn sign_payload(payload: &str, secret: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Build the OAuth state: base64url("nonce|timestamp_hex|signature_hex").
fn encode_state(nonce: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", nonce, timestamp_ms);
    let signature = sign_payload(&payload, secret)?.finalize().into_bytes();
    let signed_state = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify the state signature and age, returning the embedded nonce.
fn verify_and_decode_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return None;
    };

    let signature = hex::decode(signature_hex).ok()?;
    let payload = format!("{}|{}", nonce, timestamp_hex);
    if sign_payload(&payload, secret).ok()?.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if issued_ms > now_ms + STATE_CLOCK_SKEW_MS || now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE_MS
    {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(nonce.to_string())
}
