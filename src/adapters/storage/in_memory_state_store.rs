//! In-Memory State Store Adapter
//!
//! Keeps each user's conversation state as a JSON document in memory.
//! Records go through the same serde path a document database would, so
//! lenient loading of hand-edited or legacy records is exercised in tests.
//! Useful for testing and development.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::coaching::ConversationState;
use crate::domain::foundation::UserId;
use crate::ports::{StateStore, StateStoreError};

/// In-memory storage for conversation state
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    records: Arc<RwLock<HashMap<UserId, Value>>>,
}

impl InMemoryStateStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw record, bypassing serialization. Lets tests seed
    /// records shaped the way an older writer left them.
    pub async fn insert_raw(&self, user_id: UserId, record: Value) {
        self.records.write().await.insert(user_id, record);
    }

    /// Read the raw record for a user.
    pub async fn raw(&self, user_id: &UserId) -> Option<Value> {
        self.records.read().await.get(user_id).cloned()
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    /// Get the number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no record is stored
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, user_id: &UserId) -> Result<Option<ConversationState>, StateStoreError> {
        let records = self.records.read().await;
        match records.get(user_id) {
            Some(record) => serde_json::from_value(record.clone())
                .map(Some)
                .map_err(|e| StateStoreError::DeserializationFailed(e.to_string())),
            None => Ok(None),
        }
    }

    async fn save(&self, user_id: &UserId, state: &ConversationState) -> Result<(), StateStoreError> {
        let record = serde_json::to_value(state)
            .map_err(|e| StateStoreError::SerializationFailed(e.to_string()))?;

        self.records.write().await.insert(user_id.clone(), record);
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), StateStoreError> {
        self.records.write().await.remove(user_id);
        Ok(())
    }
}
