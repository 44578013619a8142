//! Per-sender serialization of the conversation path.
//!
//! Two emails from a new sender arriving together would otherwise both miss
//! the visitor and room lookups and create duplicates.

use dashmap::DashMap;
use di::{inject, injectable};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

#[derive(Default)]
pub struct SenderLocks {
    locks: Arc<LockMap>,
}

#[injectable]
impl SenderLocks {
    #[inject]
    pub fn create() -> SenderLocks {
        SenderLocks::default()
    }
}

impl SenderLocks {
    /// Waits until no other task holds the lock for `key`.
    pub async fn lock(&self, key: &str) -> SenderLock {
        let mutex = self.locks.entry(key.to_owned()).or_default().clone();
        let guard = mutex.lock_owned().await;

        SenderLock {
            key: key.to_owned(),
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct SenderLock {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl Drop for SenderLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map itself still references an idle mutex.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(SenderLocks::default());
        let first = locks.lock("jane@example.com").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.lock("jane@example.com").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_other_keys_do_not_wait() {
        let locks = SenderLocks::default();
        let _first = locks.lock("jane@example.com").await;
        let _second = locks.lock("bob@example.com").await;
        assert_eq!(locks.len(), 2);
    }
}
