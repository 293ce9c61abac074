//! In-process leases serializing lookup-then-write sequences.
//!
//! The identity store is only atomic per key. The INSERT lookup on the
//! (forename, dob) index followed by a create, and the UPDATE fork, are
//! serialized by holding leases on the index pair and on record keys.
//!
//! Index leases are always taken before record leases, and a multi-lease
//! acquisition is all-or-nothing, so holders cannot deadlock.

use crate::models::LinkageKey;
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default lease acquisition timeout.
pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Something a lease can be held on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeaseKey {
    /// A masked (forename, dob) index pair.
    Index(String, String),
    /// A stored record.
    Record(LinkageKey),
}

impl LeaseKey {
    /// Lease on a masked (forename, dob) pair.
    #[must_use]
    pub fn index(forename: &str, dob: &str) -> Self {
        Self::Index(forename.to_string(), dob.to_string())
    }

    /// Lease on a record key.
    #[must_use]
    pub fn record(key: &LinkageKey) -> Self {
        Self::Record(key.clone())
    }
}

/// Table of currently held leases.
#[derive(Debug)]
pub struct LeaseTable {
    held: Mutex<HashSet<LeaseKey>>,
    released: Condvar,
    timeout: Duration,
}

impl Default for LeaseTable {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE_TIMEOUT)
    }
}

impl LeaseTable {
    /// Creates an empty lease table with the given acquisition timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Acquires every lease in `keys` at once, waiting until none is held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the leases cannot be acquired
    /// within the table's timeout.
    pub fn acquire(&self, keys: impl IntoIterator<Item = LeaseKey>) -> Result<LeaseGuard<'_>> {
        let mut keys: Vec<LeaseKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let deadline = Instant::now() + self.timeout;
        let mut held = self.lock_held();

        while keys.iter().any(|key| held.contains(key)) {
            let now = Instant::now();
            if now >= deadline {
                metrics::counter!("linkage_lease_timeouts_total").increment(1);
                return Err(Error::OperationFailed {
                    operation: "acquire_lease".to_string(),
                    cause: format!("lease not released within {:?}", self.timeout),
                });
            }
            held = match self.released.wait_timeout(held, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        held.extend(keys.iter().cloned());
        drop(held);

        Ok(LeaseGuard { table: self, keys })
    }

    #[cfg(test)]
    fn held_count(&self) -> usize {
        self.lock_held().len()
    }

    fn lock_held(&self) -> MutexGuard<'_, HashSet<LeaseKey>> {
        match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Lease table mutex was poisoned, recovering");
                poisoned.into_inner()
            },
        }
    }
}

/// Releases its leases on drop.
#[derive(Debug)]
#[must_use = "leases are released as soon as the guard is dropped"]
pub struct LeaseGuard<'a> {
    table: &'a LeaseTable,
    keys: Vec<LeaseKey>,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.table.lock_held();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.table.released.notify_all();
    }
}
