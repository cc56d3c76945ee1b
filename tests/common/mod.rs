// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use study_buddy_auth::config::Config;
use study_buddy_auth::db::{FirestoreDb, UserStore};
use study_buddy_auth::error::AppError;
use study_buddy_auth::models::UserRecord;
use study_buddy_auth::routes::create_router;
use study_buddy_auth::services::{AuthenticatedUser, IdentityProvider, SignInService};
use study_buddy_auth::AppState;

/// Authorization code the fake provider accepts.
#[allow(dead_code)]
pub const GOOD_CODE: &str = "good-code";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn ada() -> AuthenticatedUser {
    AuthenticatedUser {
        uid: "google-uid-ada".to_string(),
        display_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
    }
}

/// Identity provider that signs in a fixed user for `GOOD_CODE`.
#[allow(dead_code)]
pub struct FakeProvider {
    pub user: AuthenticatedUser,
    pub exchanges: AtomicUsize,
}

impl FakeProvider {
    pub fn new(user: AuthenticatedUser) -> Self {
        Self {
            user,
            exchanges: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://idp.example.test/authorize?redirect_uri={}&state={}",
            urlencoding::encode(redirect_uri),
            state
        )
    }

    async fn exchange_credential(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<AuthenticatedUser, AppError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == GOOD_CODE {
            Ok(self.user.clone())
        } else {
            Err(AppError::IdentityProvider("popup closed by user".to_string()))
        }
    }
}

/// In-memory store that counts calls and can be told to fail.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeStore {
    pub records: Mutex<HashMap<String, UserRecord>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub fail_get: AtomicBool,
    pub fail_put: AtomicBool,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }

    pub fn record(&self, uid: &str) -> Option<UserRecord> {
        self.records.lock().unwrap().get(uid).cloned()
    }

    pub fn insert(&self, uid: &str, record: UserRecord) {
        self.records.lock().unwrap().insert(uid.to_string(), record);
    }
}

#[async_trait]
impl UserStore for FakeStore {
    async fn get_record(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(AppError::Database("read unavailable".to_string()));
        }
        Ok(self.record(uid))
    }

    async fn put_record(&self, uid: &str, record: &UserRecord) -> Result<(), AppError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::Database("write unavailable".to_string()));
        }
        self.insert(uid, record.clone());
        Ok(())
    }
}

/// Test harness with handles on the fakes behind the router.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub provider: Arc<FakeProvider>,
    pub store: Arc<FakeStore>,
}

/// Create a test app with fake dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_frontend_url("http://localhost:5173")
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> TestApp {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();

    let provider = Arc::new(FakeProvider::new(ada()));
    let store = Arc::new(FakeStore::default());

    let state = Arc::new(AppState {
        config,
        sign_in: SignInService::new(provider.clone(), store.clone()),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        provider,
        store,
    }
}
