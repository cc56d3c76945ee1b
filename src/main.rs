// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study Buddy sign-in server.
//!
//! Signs users in with Google, creates their Firestore record on first
//! sign-in and redirects to the features page.

use std::sync::Arc;
use study_buddy_auth::{
    config::{Config, UserStoreKind},
    db::{FirestoreDb, MemoryUserStore, UserStore},
    services::{GoogleIdTokenVerifier, GoogleIdentityProvider, SignInService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Study Buddy sign-in service");

    let users: Arc<dyn UserStore> = match config.user_store {
        UserStoreKind::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        UserStoreKind::Memory => {
            tracing::warn!("Using in-memory user store; records are lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    let verifier = GoogleIdTokenVerifier::new(&config.google_client_id)?;
    let provider = Arc::new(GoogleIdentityProvider::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        verifier,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        sign_in: SignInService::new(provider, users),
    });

    let app = study_buddy_auth::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("study_buddy_auth=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
