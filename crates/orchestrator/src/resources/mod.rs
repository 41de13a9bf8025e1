//! RAII guards for resources held while a round runs.
//!
//! - [`TaskLocks`] / [`TaskLockGuard`] - one round at a time per task id

mod task_lock;

pub use task_lock::{TaskLockGuard, TaskLocks};
