//! Per-key async locks.
//!
//! Lazily creates one `tokio::sync::Mutex` per key and drops it again once
//! no holder or waiter references it, so the map only holds keys in use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// A set of named async locks.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Arc<LockMap>,
}

/// Held lock for one key. Released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and take it.
    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        KeyGuard {
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: nobody holds or waits on it.
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_waits_for_holder() {
        let locks = Arc::new(KeyLocks::new());
        let entered = Arc::new(AtomicBool::new(false));

        let held = locks.acquire("com/example/widget/1.0/widget-1.0.pom").await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let entered = Arc::clone(&entered);
            tokio::spawn(async move {
                let _guard = locks.acquire("com/example/widget/1.0/widget-1.0.pom").await;
                entered.store(true, Ordering::SeqCst);
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!entered.load(Ordering::SeqCst));

        drop(held);
        waiter.await.unwrap();
        assert!(entered.load(Ordering::SeqCst));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _jar = locks.acquire("a/b/1.0/b-1.0.jar").await;
        let _pom = tokio::time::timeout(Duration::from_secs(1), locks.acquire("a/b/1.0/b-1.0.pom"))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_keys_are_forgotten() {
        let locks = KeyLocks::new();
        for _ in 0..3 {
            let _guard = locks.acquire("x/y/1/y-1.jar").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }
}
