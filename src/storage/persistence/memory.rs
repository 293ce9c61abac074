//! In-memory identity store.
//!
//! Fast, non-persistent implementation of [`IdentityStore`] for tests and
//! dry runs.

use crate::models::{IdentityRecord, LinkageKey};
use crate::storage::metrics::timed;
use crate::storage::traits::IdentityStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

const BACKEND: &str = "memory";

/// A stored record with its creation sequence number.
#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: IdentityRecord,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<LinkageKey, Entry>,
    next_seq: u64,
}

impl Inner {
    /// Inserts or replaces a record, keeping its sequence and `created_at`.
    fn upsert(&mut self, record: &IdentityRecord, now: DateTime<Utc>) {
        let existing = self
            .entries
            .get(&record.key)
            .map(|entry| (entry.seq, entry.record.created_at));

        let (seq, created_at) = if let Some((seq, created_at)) = existing {
            (seq, created_at.or(record.created_at))
        } else {
            let seq = self.next_seq;
            self.next_seq += 1;
            (seq, record.created_at.or(Some(now)))
        };

        let mut stored = record.clone();
        stored.created_at = created_at;
        stored.updated_at = Some(now);
        self.entries.insert(
            record.key.clone(),
            Entry {
                seq,
                record: stored,
            },
        );
    }
}

/// In-memory identity store.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Data is not persisted between runs.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<Inner>,
}

impl InMemoryIdentityStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(operation: &str) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: "in-memory store lock poisoned".to_string(),
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn get(&self, key: &LinkageKey) -> Result<Option<IdentityRecord>> {
        timed(BACKEND, "get", || {
            let inner = self.inner.read().map_err(|_| poisoned("get_identity"))?;
            Ok(inner.entries.get(key).map(|entry| entry.record.clone()))
        })
    }

    fn get_by_forename_dob(&self, forename: &str, dob: &str) -> Result<Option<IdentityRecord>> {
        timed(BACKEND, "get_by_forename_dob", || {
            let inner = self
                .inner
                .read()
                .map_err(|_| poisoned("get_identity_by_forename_dob"))?;
            Ok(inner
                .entries
                .values()
                .filter(|entry| entry.record.index_pair() == Some((forename, dob)))
                .max_by_key(|entry| entry.seq)
                .map(|entry| entry.record.clone()))
        })
    }

    fn put(&self, record: &IdentityRecord) -> Result<()> {
        timed(BACKEND, "put", || {
            let mut inner = self.inner.write().map_err(|_| poisoned("put_identity"))?;
            inner.upsert(record, Utc::now());
            Ok(())
        })
    }

    fn delete(&self, key: &LinkageKey) -> Result<bool> {
        timed(BACKEND, "delete", || {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| poisoned("delete_identity"))?;
            Ok(inner.entries.remove(key).is_some())
        })
    }

    fn list_keys(&self) -> Result<Vec<LinkageKey>> {
        timed(BACKEND, "list_keys", || {
            let inner = self.inner.read().map_err(|_| poisoned("list_keys"))?;
            let mut entries: Vec<&Entry> = inner.entries.values().collect();
            entries.sort_by_key(|entry| entry.seq);
            Ok(entries
                .into_iter()
                .map(|entry| entry.record.key.clone())
                .collect())
        })
    }

    fn count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| poisoned("count_identities"))?;
        Ok(inner.entries.len())
    }

    fn fork(&self, forked: &IdentityRecord, previous: &IdentityRecord) -> Result<bool> {
        timed(BACKEND, "fork", || {
            let mut inner = self.inner.write().map_err(|_| poisoned("fork_identity"))?;
            let now = Utc::now();
            inner.upsert(forked, now);
            if previous.is_unreferenced() {
                inner.entries.remove(&previous.key);
                Ok(true)
            } else {
                inner.upsert(previous, now);
                Ok(false)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    fn record(key: &str, forename: &str, dob: &str) -> IdentityRecord {
        let mut record = IdentityRecord::with_key(LinkageKey::new(key));
        record.attributes.forename = Some(forename.to_string());
        record.attributes.dob = Some(dob.to_string());
        record.counters.set(SourceType::Pan, 1);
        record
    }

    #[test]
    fn test_put_get_delete() {
        let store = InMemoryIdentityStore::new();
        let r = record("k1", "f", "d");
        store.put(&r).unwrap();

        let got = store.get(&r.key).unwrap().unwrap();
        assert_eq!(got.counter(SourceType::Pan), 1);
        assert!(got.created_at.is_some());

        assert!(store.delete(&r.key).unwrap());
        assert!(!store.delete(&r.key).unwrap());
        assert!(store.get(&r.key).unwrap().is_none());
    }

    #[test]
    fn test_created_at_is_preserved() {
        let store = InMemoryIdentityStore::new();
        store.put(&record("k1", "f", "d")).unwrap();
        let first = store.get(&LinkageKey::new("k1")).unwrap().unwrap();

        let mut stripped = first.clone();
        stripped.created_at = None;
        store.put(&stripped).unwrap();

        let second = store.get(&LinkageKey::new("k1")).unwrap().unwrap();
        assert_eq!(second.created_at, first.created_at);
    }

    #[test]
    fn test_lookup_prefers_latest_record() {
        let store = InMemoryIdentityStore::new();
        store.put(&record("a", "f", "d")).unwrap();
        store.put(&record("b", "f", "d")).unwrap();
        store.put(&record("a", "f", "d")).unwrap();

        let found = store.get_by_forename_dob("f", "d").unwrap().unwrap();
        assert_eq!(found.key.as_str(), "b");
        assert_eq!(
            store.list_keys().unwrap(),
            vec![LinkageKey::new("a"), LinkageKey::new("b")]
        );
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_fork_retires_unreferenced_previous() {
        let store = InMemoryIdentityStore::new();
        let mut previous = record("old", "f", "d");
        store.put(&previous).unwrap();

        previous.counters.set(SourceType::Pan, 0);
        let mut forked = record("new", "f", "d");
        forked.forked_from = Some(previous.key.clone());

        assert!(store.fork(&forked, &previous).unwrap());
        assert!(store.get(&previous.key).unwrap().is_none());
        let found = store.get_by_forename_dob("f", "d").unwrap().unwrap();
        assert_eq!(found.key.as_str(), "new");
    }
}
