use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-task advisory locks
///
/// Serializes execute and confirm calls for one task id. Calls for different
/// ids never contend.
#[derive(Default)]
pub struct TaskLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `task_id`
    pub async fn acquire(&self, task_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on
            locks.retain(|id, lock| id == task_id || Arc::strong_count(lock) > 1);
            locks
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_task_is_serialized() {
        let locks = Arc::new(TaskLocks::new());
        let guard = locks.acquire("t1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("t1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_tasks_do_not_contend() {
        let locks = TaskLocks::new();
        let _a = locks.acquire("a").await;
        let acquired = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = TaskLocks::new();
        drop(locks.acquire("a").await);
        drop(locks.acquire("b").await);
        assert_eq!(locks.len(), 1);
    }
}
