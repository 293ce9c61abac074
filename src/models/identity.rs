//! Identity record types.

use super::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique linkage key of an identity record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkageKey(String);

impl LinkageKey {
    /// Creates a linkage key from an existing value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generates a fresh, never-reused key.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LinkageKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LinkageKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Pseudonymized personal attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedAttributes {
    /// Masked forename (index component).
    pub forename: Option<String>,
    /// Masked second name.
    pub secondname: Option<String>,
    /// Masked last name.
    pub lastname: Option<String>,
    /// Masked date of birth (index component).
    pub dob: Option<String>,
    /// Masked address.
    pub address: Option<String>,
}

impl MaskedAttributes {
    /// Returns `newer` with its absent attributes taken from `self`.
    #[must_use]
    pub fn overlay(self, newer: Self) -> Self {
        Self {
            forename: newer.forename.or(self.forename),
            secondname: newer.secondname.or(self.secondname),
            lastname: newer.lastname.or(self.lastname),
            dob: newer.dob.or(self.dob),
            address: newer.address.or(self.address),
        }
    }

    /// Returns the masked (forename, dob) index pair, if both are present.
    #[must_use]
    pub fn index_pair(&self) -> Option<(&str, &str)> {
        Some((self.forename.as_deref()?, self.dob.as_deref()?))
    }
}

/// Per-source values, one slot per [`SourceType`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSource<T>([T; 4]);

impl<T> PerSource<T> {
    /// Creates per-source values from an array in [`SourceType::all`] order.
    #[must_use]
    pub const fn from_array(values: [T; 4]) -> Self {
        Self(values)
    }

    /// Returns the value for a source.
    #[must_use]
    pub const fn get(&self, source: SourceType) -> &T {
        &self.0[source.index()]
    }

    /// Replaces the value for a source.
    pub fn set(&mut self, source: SourceType, value: T) {
        self.0[source.index()] = value;
    }

    /// Iterates `(source, value)` pairs in counter order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceType, &T)> {
        SourceType::all().iter().copied().zip(self.0.iter())
    }
}

/// Active linkage counts per source.
pub type SourceCounters = PerSource<u32>;

/// Masked document numbers per source.
pub type DocumentValues = PerSource<Option<String>>;

impl SourceCounters {
    /// Returns true if no source references the identity.
    #[must_use]
    pub fn all_zero(&self) -> bool {
        self.0.iter().all(|count| *count == 0)
    }
}

/// The persisted, deduplicated identity of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Unique, immutable linkage key.
    pub key: LinkageKey,
    /// Pseudonymized personal attributes.
    pub attributes: MaskedAttributes,
    /// Plain gender attribute.
    pub gender: Option<String>,
    /// Masked document numbers.
    pub documents: DocumentValues,
    /// Active linkage counts.
    pub counters: SourceCounters,
    /// Key of the record this one was forked from.
    pub forked_from: Option<LinkageKey>,
    /// Set by the store on first write.
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the store on every write.
    pub updated_at: Option<DateTime<Utc>>,
}

impl IdentityRecord {
    /// Creates an empty record with a freshly generated key and zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_key(LinkageKey::generate())
    }

    /// Creates an empty record with the given key.
    #[must_use]
    pub fn with_key(key: LinkageKey) -> Self {
        Self {
            key,
            attributes: MaskedAttributes::default(),
            gender: None,
            documents: DocumentValues::default(),
            counters: SourceCounters::default(),
            forked_from: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns the counter for a source.
    #[must_use]
    pub const fn counter(&self, source: SourceType) -> u32 {
        *self.counters.get(source)
    }

    /// Returns the masked document value for a source.
    #[must_use]
    pub fn document(&self, source: SourceType) -> Option<&str> {
        self.documents.get(source).as_deref()
    }

    /// Returns true if no source references this record.
    #[must_use]
    pub fn is_unreferenced(&self) -> bool {
        self.counters.all_zero()
    }

    /// Returns the masked (forename, dob) index pair, if both are present.
    #[must_use]
    pub fn index_pair(&self) -> Option<(&str, &str)> {
        self.attributes.index_pair()
    }
}

impl Default for IdentityRecord {
    fn default() -> Self {
        Self::new()
    }
}
