//! Keyed async mutex serializing event handling per user
//!
//! Entries are created on first use and removed once nobody holds or waits
//! on them, so the map only grows with concurrently active users.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// One async lock per user id
#[derive(Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`
    pub async fn lock(&self, user_id: &str) -> UserGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(user_id.to_string()).or_default().clone()
        };

        let guard = slot.lock_owned().await;

        UserGuard {
            locks: self,
            user_id: user_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of users currently holding or waiting on a lock
    #[cfg(test)]
    fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, user_id: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map still references the slot: nobody holds or waits on it
        if slots
            .get(user_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(user_id);
        }
    }
}

/// Exclusive access to one user; released on drop
pub struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // Drop the owned guard first so its Arc no longer counts
        self.guard.take();
        self.locks.release(&self.user_id);
    }
}
