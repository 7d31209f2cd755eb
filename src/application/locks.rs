//! In-process lock registry
//!
//! Serialises "read state, then write" sections on the same booking or
//! room. Keys are always taken in one global order (bookings before rooms,
//! ascending ids) so two callers can never wait on each other in a cycle,
//! and every wait is bounded.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    Booking(i32),
    Room(i32),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Booking(id) => write!(f, "booking:{id}"),
            LockKey::Room(id) => write!(f, "room:{id}"),
        }
    }
}

/// Guards released together when dropped.
pub struct LockSet {
    keys: Vec<LockKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }
}

pub struct LockRegistry {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
    wait_timeout: Duration,
}

impl LockRegistry {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            wait_timeout,
        }
    }

    /// Acquires every key or none. Fails with `Busy` once the combined wait
    /// exceeds the registry timeout.
    pub async fn acquire(&self, keys: impl IntoIterator<Item = LockKey>) -> DomainResult<LockSet> {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let deadline = Instant::now() + self.wait_timeout;
        let mut guards = Vec::with_capacity(keys.len());

        for key in &keys {
            let mutex = self.locks.entry(*key).or_default().clone();
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, mutex.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    warn!(key = %key, timeout_ms = self.wait_timeout.as_millis() as u64, "Lock wait timed out");
                    metrics::counter!("stayline_lock_timeouts_total").increment(1);
                    return Err(DomainError::Busy(format!(
                        "{key} is held by another operation, try again"
                    )));
                }
            }
        }

        debug!(?keys, "Locks acquired");
        Ok(LockSet {
            keys,
            _guards: guards,
        })
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
        before - self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookings_sort_before_rooms() {
        let mut keys = vec![LockKey::Room(1), LockKey::Booking(9), LockKey::Room(0)];
        keys.sort();
        assert_eq!(
            keys,
            vec![LockKey::Booking(9), LockKey::Room(0), LockKey::Room(1)]
        );
    }

    #[tokio::test]
    async fn second_holder_times_out_with_busy() {
        let registry = LockRegistry::new(Duration::from_millis(50));
        let held = registry.acquire([LockKey::Room(101)]).await.unwrap();

        let err = registry.acquire([LockKey::Room(101)]).await.err().unwrap();
        assert!(matches!(err, DomainError::Busy(_)));

        drop(held);
        assert!(registry.acquire([LockKey::Room(101)]).await.is_ok());
    }

    #[tokio::test]
    async fn overlapping_sets_do_not_deadlock() {
        let registry = Arc::new(LockRegistry::new(Duration::from_secs(2)));
        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let keys = if i % 2 == 0 {
                    vec![LockKey::Room(1), LockKey::Room(2), LockKey::Booking(1)]
                } else {
                    vec![LockKey::Room(2), LockKey::Booking(1), LockKey::Room(1)]
                };
                let set = registry.acquire(keys).await.unwrap();
                assert_eq!(set.keys()[0], LockKey::Booking(1));
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
    }

    #[tokio::test]
    async fn duplicate_keys_are_taken_once() {
        let registry = LockRegistry::default();
        let set = registry
            .acquire([LockKey::Room(3), LockKey::Room(3)])
            .await
            .unwrap();
        assert_eq!(set.keys(), &[LockKey::Room(3)]);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let registry = LockRegistry::default();
        let held = registry.acquire([LockKey::Booking(1)]).await.unwrap();
        drop(registry.acquire([LockKey::Booking(2)]).await.unwrap());

        assert_eq!(registry.prune_idle(), 1);
        assert_eq!(registry.len(), 1);
        drop(held);
        assert_eq!(registry.prune_idle(), 1);
        assert!(registry.is_empty());
    }
}
