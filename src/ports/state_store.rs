//! State Store Port - Interface for persisting per-user conversation state.
//!
//! The coaching core never writes state itself; handlers load a record,
//! run the controller, merge the returned patch and save the result.

use async_trait::async_trait;

use crate::domain::coaching::ConversationState;
use crate::domain::foundation::UserId;

/// Errors that can occur during state store operations
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("Failed to serialize state: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize state: {0}")]
    DeserializationFailed(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Port for loading and saving conversation state keyed by user.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state for a user.
    ///
    /// # Returns
    /// `None` on first contact.
    async fn load(&self, user_id: &UserId) -> Result<Option<ConversationState>, StateStoreError>;

    /// Save the full state for a user, replacing any previous record.
    async fn save(&self, user_id: &UserId, state: &ConversationState) -> Result<(), StateStoreError>;

    /// Delete the state for a user. Deleting a missing record is not an error.
    async fn delete(&self, user_id: &UserId) -> Result<(), StateStoreError>;
}
