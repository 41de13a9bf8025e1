//! Per-task mutual exclusion.
//!
//! Two rounds for the same task must not interleave their read-modify-write
//! of the repository, so each round holds the task's lock for its full run.
//! Rounds for different tasks proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    /// Holder plus waiters, including waiters whose future is still pending
    users: usize,
}

type LockMap = Arc<Mutex<HashMap<String, Slot>>>;

fn lock_map(locks: &LockMap) -> MutexGuard<'_, HashMap<String, Slot>> {
    locks.lock().unwrap_or_else(|p| p.into_inner())
}

#[derive(Clone, Default)]
pub struct TaskLocks {
    locks: LockMap,
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other round holds `task`, then holds it until the
    /// returned guard is dropped.
    ///
    /// Dropping the returned future before it resolves gives up the place in
    /// line and leaves no entry behind.
    pub async fn acquire(&self, task: &str) -> TaskLockGuard {
        let (mutex, registration) = self.register(task);

        let guard = mutex.lock_owned().await;
        debug!(task = %task, "Task lock acquired");

        TaskLockGuard {
            _guard: guard,
            registration,
        }
    }

    /// Number of task ids currently locked or waited on.
    pub fn active(&self) -> usize {
        lock_map(&self.locks).len()
    }

    fn register(&self, task: &str) -> (Arc<AsyncMutex<()>>, Registration) {
        let mut locks = lock_map(&self.locks);
        let slot = locks.entry(task.to_string()).or_insert_with(|| Slot {
            mutex: Arc::new(AsyncMutex::new(())),
            users: 0,
        });
        slot.users += 1;

        let registration = Registration {
            task: task.to_string(),
            locks: self.locks.clone(),
        };
        (slot.mutex.clone(), registration)
    }
}

/// One user's claim on a map entry. Dropping the last claim removes the entry.
struct Registration {
    task: String,
    locks: LockMap,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        if let Some(slot) = locks.get_mut(&self.task) {
            slot.users -= 1;
            if slot.users == 0 {
                locks.remove(&self.task);
            }
        }
    }
}

pub struct TaskLockGuard {
    // Dropped before `registration`
    _guard: OwnedMutexGuard<()>,
    registration: Registration,
}

impl TaskLockGuard {
    pub fn task(&self) -> &str {
        &self.registration.task
    }
}

impl Drop for TaskLockGuard {
    fn drop(&mut self) {
        debug!(task = %self.registration.task, "Task lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_task_is_serialized() {
        let locks = TaskLocks::new();
        let first = locks.acquire("demo").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("demo").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_different_tasks_do_not_block() {
        let locks = TaskLocks::new();
        let _a = locks.acquire("task-a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("task-b")).await;

        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = TaskLocks::new();
        {
            let guard = locks.acquire("demo").await;
            assert_eq!(guard.task(), "demo");
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_leaves_no_entry() {
        let locks = TaskLocks::new();
        let first = locks.acquire("demo").await;

        let mut pending = Box::pin(locks.acquire("demo"));
        let waited = tokio::time::timeout(Duration::from_millis(10), &mut pending).await;
        assert!(waited.is_err());

        drop(first);
        assert_eq!(locks.active(), 1);

        drop(pending);
        assert_eq!(locks.active(), 0);

        let again = tokio::time::timeout(Duration::from_millis(100), locks.acquire("demo")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_drop_live_entry() {
        let locks = TaskLocks::new();
        let first = locks.acquire("demo").await;

        let mut pending = Box::pin(locks.acquire("demo"));
        let waited = tokio::time::timeout(Duration::from_millis(10), &mut pending).await;
        assert!(waited.is_err());
        drop(pending);

        assert_eq!(locks.active(), 1);
        drop(first);
        assert_eq!(locks.active(), 0);
    }
}
