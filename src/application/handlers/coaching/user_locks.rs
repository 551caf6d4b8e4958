//! Per-user serialization of state read-modify-write cycles.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::foundation::UserId;

/// Registry of one async mutex per user.
///
/// Handlers that load, modify and save a user's state hold that user's
/// guard for the whole cycle, so two messages from the same user never
/// interleave while different users proceed in parallel. Clones share the
/// registry.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    locks: Arc<RwLock<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and returns the user's guard.
    pub async fn acquire(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(user_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let mut locks = self.locks.write().await;
                Arc::clone(locks.entry(user_id.clone()).or_default())
            }
        };
        lock.lock_owned().await
    }

    /// Drops locks nobody holds or waits on.
    pub async fn prune(&self) {
        self.locks
            .write()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of users with a registered lock.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn same_user_waits_for_guard() {
        let locks = UserLocks::new();
        let guard = locks.acquire(&user("u1")).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire(&user("u1")).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.acquire(&user("a")).await;

        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&user("b"))).await;

        assert!(b.is_ok());
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = UserLocks::new();
        let held = locks.acquire(&user("a")).await;
        drop(locks.acquire(&user("b")).await);

        locks.prune().await;
        assert_eq!(locks.len().await, 1);

        drop(held);
        locks.prune().await;
        assert!(locks.is_empty().await);
    }
}
