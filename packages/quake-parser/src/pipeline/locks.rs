//! Per-domain mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per domain.
///
/// Held while a domain's schema is resolved, inferred or corrected, so two
/// workers never run inference for the same domain at the same time.
#[derive(Default)]
pub struct DomainLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lock of `domain`.
    pub async fn lock(&self, domain: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            Arc::clone(locks.entry(domain.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits for.
    pub fn prune(&self) {
        self.locks
            .lock()
            .unwrap()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
