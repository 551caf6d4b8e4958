//! ResetConversationHandler - Command handler for starting over.

use std::sync::Arc;
use tracing::info;

use super::{CoachingError, UserLocks};
use crate::domain::foundation::UserId;
use crate::ports::StateStore;

/// Command to forget a user's conversation.
#[derive(Debug, Clone)]
pub struct ResetConversationCommand {
    pub user_id: UserId,
}

/// Handler for conversation resets.
pub struct ResetConversationHandler {
    store: Arc<dyn StateStore>,
    locks: UserLocks,
}

impl ResetConversationHandler {
    pub fn new(store: Arc<dyn StateStore>, locks: UserLocks) -> Self {
        Self { store, locks }
    }

    pub async fn handle(&self, cmd: ResetConversationCommand) -> Result<(), CoachingError> {
        {
            let _guard = self.locks.acquire(&cmd.user_id).await;
            self.store.delete(&cmd.user_id).await?;
        }
        self.locks.prune().await;

        info!(user_id = %cmd.user_id, "Conversation reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryStateStore;
    use crate::domain::coaching::ConversationState;

    #[tokio::test]
    async fn reset_deletes_state_and_releases_lock() {
        let store = InMemoryStateStore::new();
        let user = UserId::new("user-1").unwrap();
        store.save(&user, &ConversationState::new()).await.unwrap();
        let locks = UserLocks::new();

        ResetConversationHandler::new(Arc::new(store.clone()), locks.clone())
            .handle(ResetConversationCommand { user_id: user.clone() })
            .await
            .unwrap();

        assert!(store.load(&user).await.unwrap().is_none());
        assert!(locks.is_empty().await);
    }
}
