//! # Keyed Locks
//!
//! An in-process table of async mutexes, one per key, created on first use
//! and dropped again once nobody holds or waits on them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DashMap<ProductId, Arc<Mutex<()>>>                                     │
//! │                                                                         │
//! │  checkout A ── lock(7) ──► [7] ◄── lock(7) ── checkout B (waits)        │
//! │  checkout C ── lock(9) ──► [9]                (independent)             │
//! │                                                                         │
//! │  guard dropped + no waiters  ──►  entry removed                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite has no row locks, so the stock ledger serializes adjustments to a
//! single product through this table. Callers that need several keys must
//! take them in ascending key order.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A cloneable handle to a shared lock table.
pub struct KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    entries: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        KeyedLocks {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let mutex = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;

        KeyedGuard {
            key,
            guard: Some(guard),
            entries: Arc::clone(&self.entries),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn clone(&self) -> Self {
        KeyedLocks {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K> fmt::Debug for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLocks")
            .field("held", &self.entries.len())
            .finish()
    }
}

/// Exclusive access to one key. Released on drop.
pub struct KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    entries: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Drop for KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // Release the mutex first so its Arc count reflects only the table
        // and any waiters.
        drop(self.guard.take());
        self.entries
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_is_pruned_after_release() {
        let locks: KeyedLocks<i64> = KeyedLocks::new();

        let guard = locks.lock(1).await;
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_waits_for_holder() {
        let locks: KeyedLocks<i64> = KeyedLocks::new();
        let guard = locks.lock(7).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(7).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender acquired the lock")
            .unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks: KeyedLocks<i64> = KeyedLocks::new();
        let _a = locks.lock(1).await;

        let b = tokio::time::timeout(Duration::from_millis(200), locks.lock(2)).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
