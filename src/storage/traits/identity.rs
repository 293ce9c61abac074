//! Identity store trait.

use crate::Result;
use crate::models::{IdentityRecord, LinkageKey};

/// Trait for identity store backends.
///
/// Identity stores are the authoritative source of truth for identity records.
/// Each method is atomic for the single key it touches; composite
/// lookup-then-write sequences are serialized by the linkage engine.
pub trait IdentityStore: Send + Sync {
    /// Returns the backend name (for logs and metrics).
    fn name(&self) -> &'static str;

    /// Retrieves a record by linkage key.
    fn get(&self, key: &LinkageKey) -> Result<Option<IdentityRecord>>;

    /// Retrieves the record indexed under a masked (forename, dob) pair.
    ///
    /// When fork lineages leave several records on one pair, the most recently
    /// created record is returned.
    fn get_by_forename_dob(&self, forename: &str, dob: &str) -> Result<Option<IdentityRecord>>;

    /// Inserts or replaces a record.
    ///
    /// The store sets `created_at` on first write (keeping it on later writes)
    /// and `updated_at` on every write.
    fn put(&self, record: &IdentityRecord) -> Result<()>;

    /// Deletes a record by key. Returns true if a record was removed.
    fn delete(&self, key: &LinkageKey) -> Result<bool>;

    /// Lists all linkage keys.
    fn list_keys(&self) -> Result<Vec<LinkageKey>>;

    /// Returns the total count of records.
    fn count(&self) -> Result<usize> {
        Ok(self.list_keys()?.len())
    }

    /// Persists a fork: writes `forked`, then deletes `previous` if no source
    /// references it anymore, or rewrites it otherwise. Returns true if
    /// `previous` was deleted.
    ///
    /// The default issues separate writes; transactional backends override it
    /// so both records change together or not at all.
    fn fork(&self, forked: &IdentityRecord, previous: &IdentityRecord) -> Result<bool> {
        self.put(forked)?;
        if previous.is_unreferenced() {
            self.delete(&previous.key)?;
            Ok(true)
        } else {
            self.put(previous)?;
            Ok(false)
        }
    }
}

impl<S: IdentityStore + ?Sized> IdentityStore for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get(&self, key: &LinkageKey) -> Result<Option<IdentityRecord>> {
        (**self).get(key)
    }

    fn get_by_forename_dob(&self, forename: &str, dob: &str) -> Result<Option<IdentityRecord>> {
        (**self).get_by_forename_dob(forename, dob)
    }

    fn put(&self, record: &IdentityRecord) -> Result<()> {
        (**self).put(record)
    }

    fn delete(&self, key: &LinkageKey) -> Result<bool> {
        (**self).delete(key)
    }

    fn list_keys(&self) -> Result<Vec<LinkageKey>> {
        (**self).list_keys()
    }

    fn fork(&self, forked: &IdentityRecord, previous: &IdentityRecord) -> Result<bool> {
        (**self).fork(forked, previous)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}
