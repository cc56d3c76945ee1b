//! Database layer (Firestore).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryUserStore;

use crate::error::AppError;
use crate::models::UserRecord;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Keyed access to user records (`users/{uid}`).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Read the record for `uid`, or `None` if it does not exist.
    async fn get_record(&self, uid: &str) -> Result<Option<UserRecord>, AppError>;

    /// Write the record for `uid`, replacing any existing document.
    async fn put_record(&self, uid: &str, record: &UserRecord) -> Result<(), AppError>;
}
