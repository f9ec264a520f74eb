//! Per-user mutual exclusion for balance-affecting operations.
//!
//! Each user gets a dedicated async lock, created the first time someone asks for it. Every caller registers its
//! interest before waiting on the lock and withdraws it when the guard is dropped (or when the wait is abandoned). The
//! registry entry is evicted only when nobody is registered any more, so two callers can never end up holding two
//! different locks for the same user.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use log::trace;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db_types::UserId;

struct LockEntry {
    lock: Arc<AsyncMutex<()>>,
    refs: usize,
}

type Registry = Arc<Mutex<HashMap<UserId, LockEntry>>>;

/// A registry of per-user locks. Clones share the same registry.
#[derive(Clone, Default)]
pub struct UserLocks {
    registry: Registry,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the caller holds the lock for `user_id`. The lock is released when the returned guard is dropped.
    pub async fn acquire(&self, user_id: UserId) -> UserLockGuard {
        let registration = self.register(user_id);
        let guard = registration.lock.clone().lock_owned().await;
        trace!("🧾️ Lock acquired for user #{user_id}");
        UserLockGuard { _guard: guard, _registration: registration }
    }

    /// The number of users with a live registry entry.
    pub fn len(&self) -> usize {
        lock_registry(&self.registry).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, user_id: UserId) -> Registration {
        let mut registry = lock_registry(&self.registry);
        let entry =
            registry.entry(user_id).or_insert_with(|| LockEntry { lock: Arc::new(AsyncMutex::new(())), refs: 0 });
        entry.refs += 1;
        Registration { registry: Arc::clone(&self.registry), user_id, lock: Arc::clone(&entry.lock) }
    }
}

// The registry is only held for map lookups and never across an await, so a poisoned lock still holds a
// consistent map.
fn lock_registry(registry: &Registry) -> MutexGuard<'_, HashMap<UserId, LockEntry>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A caller's claim on a registry entry. Dropping it gives the claim back, and evicts the entry if it was the last one.
struct Registration {
    registry: Registry,
    user_id: UserId,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut registry = lock_registry(&self.registry);
        if let Some(entry) = registry.get_mut(&self.user_id) {
            entry.refs = entry.refs.saturating_sub(1);
            if entry.refs == 0 {
                registry.remove(&self.user_id);
                trace!("🧾️ Lock for user #{} evicted", self.user_id);
            }
        }
    }
}

/// Holds the lock for a single user. Fields drop in declaration order: the lock is released before the registration.
pub struct UserLockGuard {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}
