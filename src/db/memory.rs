//! In-memory user store for local development without Firestore.

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::UserRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local user records. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryUserStore {
    records: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_record(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.records.read().await.get(uid).cloned())
    }

    async fn put_record(&self, uid: &str, record: &UserRecord) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .insert(uid.to_string(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryUserStore::new();
        assert!(store.get_record("u1").await.unwrap().is_none());

        let record = UserRecord::new_default("Ada", "ada@example.com");
        store.put_record("u1", &record).await.unwrap();

        assert_eq!(store.get_record("u1").await.unwrap(), Some(record));
        assert_eq!(store.len().await, 1);
    }
}
