use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::UserId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle entries are pruned once the map grows past this many users.
const PRUNE_THRESHOLD: usize = 1024;

/// Per-user async locks serializing cart mutations and checkout.
///
/// Different users never contend with each other.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    locks: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and returns the lock guard of `user_id`.
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= PRUNE_THRESHOLD {
                // Only the map holds an idle lock; guards and waiters keep their own Arc.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of users with a tracked lock.
    pub fn tracked_users(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = UserLocks::new();
        let user = UserId::new();

        let guard = locks.acquire(user).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire(user)).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(20), locks.acquire(user)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let locks = UserLocks::new();
        let _a = locks.acquire(UserId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(20), locks.acquire(UserId::new())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let locks = UserLocks::new();
        for _ in 0..PRUNE_THRESHOLD {
            drop(locks.acquire(UserId::new()).await);
        }
        assert_eq!(locks.tracked_users(), PRUNE_THRESHOLD);

        let _held = locks.acquire(UserId::new()).await;
        assert_eq!(locks.tracked_users(), 1);
    }
}
