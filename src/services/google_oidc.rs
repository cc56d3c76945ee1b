// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google ID token verification for the sign-in flow.

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";
const DEFAULT_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity extracted from a valid Google ID token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
}

/// ID token verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdTokenError {
    /// The token is invalid or its claims do not match expectations.
    #[error("ID token rejected: {0}")]
    Rejected(String),
    /// Fetching Google's signing keys failed.
    #[error("ID token verification unavailable: {0}")]
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct DiscoveryCacheEntry {
    jwks_uri: String,
    expires_at: Instant,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for ID tokens issued to this app's OAuth client.
pub struct GoogleIdTokenVerifier {
    http_client: reqwest::Client,
    expected_audience: String,
    mode: VerifierMode,
    discovery_cache: RwLock<Option<DiscoveryCacheEntry>>,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl GoogleIdTokenVerifier {
    /// Create a production verifier that discovers and caches Google JWKS keys.
    pub fn new(client_id: &str) -> anyhow::Result<Self> {
        tracing::info!(audience = %client_id, "Initialized Google ID token verifier");
        Self::with_mode(client_id, VerifierMode::Google)
    }

    /// Create a verifier that trusts a single RSA public key.
    ///
    /// For local runs and tests without access to Google's JWKS endpoint.
    pub fn new_with_static_key(
        client_id: &str,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static OIDC kid must not be empty");
        }

        Self::with_mode(
            client_id,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn with_mode(client_id: &str, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building OIDC HTTP client")?;

        Ok(Self {
            http_client,
            expected_audience: client_id.to_string(),
            mode,
            discovery_cache: RwLock::new(None),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify an ID token returned by Google's token endpoint.
    pub async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, IdTokenError> {
        if token.is_empty() {
            return Err(IdTokenError::Rejected("ID token is empty".to_string()));
        }

        let header = decode_header(token)
            .map_err(|e| IdTokenError::Rejected(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdTokenError::Rejected(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdTokenError::Rejected("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<GoogleIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdTokenError::Rejected(format!("JWT validation failed: {e}")))?;

        let claims = token_data.claims;

        tracing::debug!(
            subject = %claims.sub,
            email_verified = ?claims.email_verified,
            exp = claims.exp,
            "Google ID token claims"
        );

        validate_iat(claims.iat)?;
        identity_from_claims(claims)
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdTokenError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(IdTokenError::Rejected(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Google => {}
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Google rotates keys; a miss after a normal refresh forces a re-fetch.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdTokenError::Rejected(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdTokenError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        let jwks_uri = self.resolve_jwks_uri(force_refresh).await?;

        tracing::debug!(jwks_uri = %jwks_uri, "Refreshing Google JWKS cache");

        let response = self
            .http_client
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| IdTokenError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdTokenError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdTokenError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);

        if keys_by_kid.is_empty() {
            return Err(IdTokenError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Google JWKS cache refreshed");
        Ok(())
    }

    async fn resolve_jwks_uri(&self, force_refresh: bool) -> Result<String, IdTokenError> {
        if !force_refresh {
            let cache = self.discovery_cache.read().await;
            if let Some(entry) = cache
                .as_ref()
                .filter(|entry| entry.expires_at > Instant::now())
            {
                return Ok(entry.jwks_uri.clone());
            }
        }

        let cached_jwks_uri = self
            .discovery_cache
            .read()
            .await
            .as_ref()
            .map(|entry| entry.jwks_uri.clone());

        match self.http_client.get(DISCOVERY_URL).send().await {
            Ok(resp) if resp.status().is_success() => {
                let ttl = cache_ttl_from_headers(resp.headers(), DEFAULT_CACHE_TTL);
                let discovery: OpenIdConfig = resp
                    .json()
                    .await
                    .map_err(|e| IdTokenError::Transient(format!("invalid discovery JSON: {e}")))?;

                *self.discovery_cache.write().await = Some(DiscoveryCacheEntry {
                    jwks_uri: discovery.jwks_uri.clone(),
                    expires_at: Instant::now() + ttl,
                });

                Ok(discovery.jwks_uri)
            }
            Ok(resp) => {
                tracing::warn!(
                    status = %resp.status(),
                    "OIDC discovery returned non-success status; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "OIDC discovery request failed; using fallback JWKS URI"
                );
                Ok(cached_jwks_uri.unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleIdTokenClaims {
    sub: String,
    exp: usize,
    iat: Option<usize>,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }

        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }

        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn identity_from_claims(claims: GoogleIdTokenClaims) -> Result<VerifiedIdentity, IdTokenError> {
    let email = claims
        .email
        .ok_or_else(|| IdTokenError::Rejected("missing email claim".to_string()))?;

    if claims.email_verified == Some(false) {
        return Err(IdTokenError::Rejected(
            "email_verified claim is false".to_string(),
        ));
    }

    // Accounts without a profile name sign in under their email.
    let name = claims
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.clone());

    Ok(VerifiedIdentity {
        subject: claims.sub,
        email,
        name,
    })
}

fn validate_iat(iat: Option<usize>) -> Result<(), IdTokenError> {
    let Some(iat) = iat else {
        return Err(IdTokenError::Rejected("missing iat claim".to_string()));
    };

    if iat as u64 > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(IdTokenError::Rejected(
            "iat claim is in the future".to_string(),
        ));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(name: Option<&str>, email_verified: Option<bool>) -> GoogleIdTokenClaims {
        GoogleIdTokenClaims {
            sub: "1234567890".to_string(),
            exp: 0,
            iat: Some(0),
            email: Some("ada@example.com".to_string()),
            email_verified,
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn parse_cache_control_max_age_valid() {
        assert_eq!(
            parse_cache_control_max_age("public, max-age=3600"),
            Some(3600)
        );
        assert_eq!(parse_cache_control_max_age("max-age=60"), Some(60));
        assert_eq!(parse_cache_control_max_age("max-age=\"120\""), Some(120));
    }

    #[test]
    fn parse_cache_control_max_age_invalid() {
        assert_eq!(parse_cache_control_max_age("public, immutable"), None);
        assert_eq!(parse_cache_control_max_age("max-age=abc"), None);
        assert_eq!(parse_cache_control_max_age(""), None);
    }

    #[test]
    fn identity_uses_name_claim() {
        let identity = identity_from_claims(claims(Some("Ada Lovelace"), Some(true))).unwrap();
        assert_eq!(identity.subject, "1234567890");
        assert_eq!(identity.name, "Ada Lovelace");
        assert_eq!(identity.email, "ada@example.com");
    }

    #[test]
    fn identity_falls_back_to_email_for_name() {
        let identity = identity_from_claims(claims(None, None)).unwrap();
        assert_eq!(identity.name, "ada@example.com");

        let identity = identity_from_claims(claims(Some("  "), None)).unwrap();
        assert_eq!(identity.name, "ada@example.com");
    }

    #[test]
    fn identity_rejects_unverified_email() {
        assert!(matches!(
            identity_from_claims(claims(Some("Ada"), Some(false))),
            Err(IdTokenError::Rejected(_))
        ));
    }

    #[test]
    fn iat_in_future_is_rejected() {
        let future = (now_unix_secs() + 3600) as usize;
        assert!(matches!(
            validate_iat(Some(future)),
            Err(IdTokenError::Rejected(_))
        ));
        assert!(validate_iat(Some(now_unix_secs() as usize)).is_ok());
        assert!(validate_iat(None).is_err());
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_without_network() {
        let verifier = GoogleIdTokenVerifier::new("client-id").unwrap();
        assert!(matches!(
            verifier.verify_id_token("not-a-jwt").await,
            Err(IdTokenError::Rejected(_))
        ));
        assert!(matches!(
            verifier.verify_id_token("").await,
            Err(IdTokenError::Rejected(_))
        ));
    }

    const CLIENT_ID: &str = "client-id.apps.googleusercontent.com";
    const TEST_KID: &str = "test-kid";
    const TEST_PRIVATE_KEY: &[u8] = include_bytes!("testdata/id_token_test_key.pem");
    const TEST_PUBLIC_KEY: &[u8] = include_bytes!("testdata/id_token_test_key.pub.pem");

    fn static_verifier() -> GoogleIdTokenVerifier {
        let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).unwrap();
        GoogleIdTokenVerifier::new_with_static_key(CLIENT_ID, TEST_KID, key).unwrap()
    }

    fn token_claims() -> serde_json::Value {
        let now = now_unix_secs();
        serde_json::json!({
            "iss": "https://accounts.google.com",
            "aud": CLIENT_ID,
            "sub": "110169484474386276334",
            "iat": now,
            "exp": now + 3600,
            "email": "ada@example.com",
            "email_verified": true,
            "name": "Ada Lovelace"
        })
    }

    fn sign_rs256(kid: &str, claims: &serde_json::Value) -> String {
        let mut header = jsonwebtoken::Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).unwrap();
        jsonwebtoken::encode(&header, claims, &key).unwrap()
    }

    async fn assert_rejected(verifier: &GoogleIdTokenVerifier, token: &str) {
        let result = verifier.verify_id_token(token).await;
        assert!(
            matches!(result, Err(IdTokenError::Rejected(_))),
            "expected rejection, got {result:?}"
        );
    }

    #[test]
    fn static_key_requires_kid() {
        let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).unwrap();
        assert!(GoogleIdTokenVerifier::new_with_static_key(CLIENT_ID, " ", key).is_err());
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let verifier = static_verifier();
        let token = sign_rs256(TEST_KID, &token_claims());

        let identity = verifier.verify_id_token(&token).await.unwrap();
        assert_eq!(identity.subject, "110169484474386276334");
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn bare_issuer_is_accepted() {
        let mut claims = token_claims();
        claims["iss"] = "accounts.google.com".into();

        let token = sign_rs256(TEST_KID, &claims);
        assert!(static_verifier().verify_id_token(&token).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let mut claims = token_claims();
        claims["aud"] = "someone-else.apps.googleusercontent.com".into();
        assert_rejected(&static_verifier(), &sign_rs256(TEST_KID, &claims)).await;
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let mut claims = token_claims();
        claims["iss"] = "https://evil.example.com".into();
        assert_rejected(&static_verifier(), &sign_rs256(TEST_KID, &claims)).await;
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let token = sign_rs256("rotated-away", &token_claims());
        assert_rejected(&static_verifier(), &token).await;
    }

    #[tokio::test]
    async fn hs256_token_is_rejected() {
        let mut header = jsonwebtoken::Header::new(Algorithm::HS256);
        header.kid = Some(TEST_KID.to_string());
        let token = jsonwebtoken::encode(
            &header,
            &token_claims(),
            &jsonwebtoken::EncodingKey::from_secret(TEST_PUBLIC_KEY),
        )
        .unwrap();
        assert_rejected(&static_verifier(), &token).await;
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let mut claims = token_claims();
        let now = now_unix_secs();
        claims["iat"] = (now - 7200).into();
        claims["exp"] = (now - 3600).into();
        assert_rejected(&static_verifier(), &sign_rs256(TEST_KID, &claims)).await;
    }

    #[tokio::test]
    async fn future_iat_is_rejected() {
        let mut claims = token_claims();
        claims["iat"] = (now_unix_secs() + 3600).into();
        assert_rejected(&static_verifier(), &sign_rs256(TEST_KID, &claims)).await;
    }

    #[tokio::test]
    async fn missing_subject_is_rejected() {
        let mut claims = token_claims();
        claims.as_object_mut().unwrap().remove("sub");
        assert_rejected(&static_verifier(), &sign_rs256(TEST_KID, &claims)).await;
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let token = sign_rs256(TEST_KID, &token_claims());
        // Flip a character in the signature segment
        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut sig = sig.to_string();
        let replacement = if sig.starts_with('A') { "B" } else { "A" };
        sig.replace_range(0..1, replacement);
        assert_rejected(&static_verifier(), &format!("{head}.{sig}")).await;
    }
}
