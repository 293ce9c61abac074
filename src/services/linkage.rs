//! Identity linkage service.
//!
//! Decides whether a submission refers to an existing identity or a new one,
//! maintains per-source linkage counters, forks records on update, and retires
//! records no source references anymore.
//!
//! # Operations
//!
//! | Action | Effect |
//! |--------|--------|
//! | INSERT | Match on masked (forename, dob); create if absent; link the source once |
//! | UPDATE | Fork: new record inherits counters +1 for the source, old record −1 |
//! | DELETE | Zero the source's counter; delete the record when nothing remains |
//! | SEARCH | Summary view of a record |

use super::lease::{LeaseKey, LeaseTable};
use super::matching::{Attributes, MaskedIndex, gender, mask_attributes};
use crate::models::{
    Action, IdentityRecord, IdentitySummary, LinkageKey, LinkageRequest, LinkageResponse,
    SourceType,
};
use crate::security::Pseudonymizer;
use crate::storage::IdentityStore;
use crate::{Error, Result};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::instrument;

/// How an INSERT was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    /// No record matched; a new one was created.
    Created,
    /// An existing record gained a newly linked source.
    SourceAttached,
    /// The source was already linked; nothing changed.
    AlreadyLinked,
}

/// Result of an INSERT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// How the insert was applied.
    pub kind: InsertKind,
    /// Summary of the matched or created record.
    pub summary: IdentitySummary,
}

/// Result of an UPDATE fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkOutcome {
    /// Key of the record that was forked.
    pub previous_key: LinkageKey,
    /// Key of the newly created record.
    pub new_key: LinkageKey,
    /// Whether the previous record was deleted.
    pub previous_retired: bool,
}

/// Result of a DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No source remained; the record was removed.
    Removed(LinkageKey),
    /// The source was unlinked; other sources remain.
    Unlinked(IdentitySummary),
}

/// Result of any dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkageOutcome {
    /// INSERT result.
    Inserted(InsertOutcome),
    /// UPDATE result.
    Forked(ForkOutcome),
    /// DELETE result.
    Deleted(DeleteOutcome),
    /// SEARCH result.
    Found(IdentitySummary),
}

impl LinkageOutcome {
    /// Converts the outcome into a SUCCESS response envelope.
    #[must_use]
    pub fn into_response(self) -> LinkageResponse {
        match self {
            Self::Inserted(InsertOutcome { kind, summary }) => {
                let message = match kind {
                    InsertKind::Created => "Record inserted successfully",
                    InsertKind::SourceAttached => "Record updated with new source",
                    InsertKind::AlreadyLinked => "Source already linked; no changes applied",
                };
                LinkageResponse::success(message, summary.to_json())
            },
            Self::Forked(fork) => {
                let message = if fork.previous_retired {
                    "Record forked; previous record retired"
                } else {
                    "Record forked; previous record retained"
                };
                LinkageResponse::success(
                    message,
                    serde_json::json!({ "newKey": fork.new_key.as_str() }),
                )
            },
            Self::Deleted(DeleteOutcome::Removed(key)) => LinkageResponse::success(
                "Record removed; no linked sources remain",
                serde_json::json!({ "aadhaarLinkageKey": key.as_str() }),
            ),
            Self::Deleted(DeleteOutcome::Unlinked(summary)) => {
                LinkageResponse::success("Source unlinked successfully", summary.to_json())
            },
            Self::Found(summary) => LinkageResponse::success("Record found", summary.to_json()),
        }
    }
}

/// Service applying linkage actions to an identity store.
pub struct LinkageService<S, P> {
    store: S,
    pseudonymizer: P,
    leases: LeaseTable,
}

impl<S: IdentityStore, P: Pseudonymizer> LinkageService<S, P> {
    /// Creates a new linkage service.
    #[must_use]
    pub fn new(store: S, pseudonymizer: P) -> Self {
        Self {
            store,
            pseudonymizer,
            leases: LeaseTable::default(),
        }
    }

    /// Sets how long an operation waits for a conflicting one to finish.
    #[must_use]
    pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.leases = LeaseTable::new(timeout);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the pseudonymizer.
    #[must_use]
    pub const fn pseudonymizer(&self) -> &P {
        &self.pseudonymizer
    }

    /// Processes a request into a response envelope.
    ///
    /// Validation and not-found failures become ERROR responses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store or a lease fails.
    pub fn process(&self, request: &LinkageRequest) -> Result<LinkageResponse> {
        let start = Instant::now();
        let action = Action::parse(&request.action).map_or("INVALID", |a| a.as_str());

        let (status, result) = match self.dispatch(request) {
            Ok(outcome) => ("success", Ok(outcome.into_response())),
            Err(e) if e.is_recoverable() => {
                tracing::debug!(action, error = %e, "Linkage request rejected");
                ("rejected", Ok(LinkageResponse::error(e.to_string())))
            },
            Err(e) => {
                tracing::error!(action, error = %e, "Linkage request failed");
                ("error", Err(e))
            },
        };

        metrics::counter!(
            "linkage_operations_total",
            "action" => action,
            "status" => status
        )
        .increment(1);
        metrics::histogram!("linkage_operation_duration_ms", "action" => action)
            .record(start.elapsed().as_secs_f64() * 1000.0);

        result
    }

    /// Routes a request to its action handler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown action or malformed
    /// request, [`Error::NotFound`] for an unknown key, and
    /// [`Error::OperationFailed`] for store failures.
    pub fn dispatch(&self, request: &LinkageRequest) -> Result<LinkageOutcome> {
        let action = Action::parse(&request.action)
            .ok_or_else(|| Error::Validation(format!("Invalid action: {}", request.action)))?;
        let key = request.prior_key.as_deref();
        let data = request.data.as_ref();

        match action {
            Action::Insert => {
                let source = parse_source(&request.source)?;
                self.insert(source, data).map(LinkageOutcome::Inserted)
            },
            Action::Update => {
                let key = require_key(key, action)?;
                let source = parse_source(&request.source)?;
                self.update(&key, source, data).map(LinkageOutcome::Forked)
            },
            Action::Delete => {
                let key = require_key(key, action)?;
                let source = parse_source(&request.source)?;
                self.delete(&key, source).map(LinkageOutcome::Deleted)
            },
            Action::Search => {
                let key = require_key(key, action)?;
                self.search(&key).map(LinkageOutcome::Found)
            },
        }
    }

    /// Links `source` to the identity matching the submitted forename and dob,
    /// creating the identity if none matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if data is missing or lacks forename/dob,
    /// and [`Error::OperationFailed`] for store failures.
    #[instrument(skip_all, fields(action = "INSERT", source = %source))]
    pub fn insert(
        &self,
        source: SourceType,
        data: Option<&HashMap<String, String>>,
    ) -> Result<InsertOutcome> {
        let attributes = Attributes::require(data, Action::Insert)?;
        let index = MaskedIndex::from_attributes(&attributes, Action::Insert, &self.pseudonymizer)?;

        let _index_lease = self
            .leases
            .acquire([LeaseKey::index(&index.forename, &index.dob)])?;

        // A DELETE holds only the record lease, so it can retire the match
        // between the lookup and the record lease; look up again until both agree
        let matched = loop {
            let Some(found) = self.store.get_by_forename_dob(&index.forename, &index.dob)? else {
                break None;
            };
            let lease = self.leases.acquire([LeaseKey::record(&found.key)])?;
            if let Some(fresh) = self.store.get(&found.key)? {
                break Some((fresh, lease));
            }
            tracing::debug!(
                key = %found.key,
                "Matched identity retired before lease, retrying lookup"
            );
        };

        let (mut record, created, _record_lease) = match matched {
            Some((record, lease)) => (record, false, Some(lease)),
            None => {
                let mut record = IdentityRecord::new();
                record.attributes = mask_attributes(&attributes, &self.pseudonymizer);
                record.gender = gender(&attributes);
                (record, true, None)
            },
        };

        let new_source = created || record.counter(source) == 0;
        if new_source {
            record.counters.set(source, 1);
            if let Some(document) = attributes.document(source) {
                record
                    .documents
                    .set(source, Some(self.pseudonymizer.mask(document)));
            }
        }

        self.store.put(&record)?;

        let kind = match (created, new_source) {
            (true, _) => InsertKind::Created,
            (false, true) => InsertKind::SourceAttached,
            (false, false) => InsertKind::AlreadyLinked,
        };
        tracing::info!(key = %record.key, ?kind, "Identity linked");

        Ok(InsertOutcome {
            kind,
            summary: IdentitySummary::of(&record),
        })
    }

    /// Forks the identity at `key` with new attributes.
    ///
    /// The new record inherits every counter and document value, gains one
    /// linkage for `source`, and takes the freshly masked attributes; those
    /// absent from `data` keep the old record's values. The old record loses
    /// one linkage for `source` and is deleted if nothing references it
    /// anymore. Both records are written through [`IdentityStore::fork`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `key` does not resolve and
    /// [`Error::OperationFailed`] for store failures.
    #[instrument(skip_all, fields(action = "UPDATE", key = %key, source = %source))]
    pub fn update(
        &self,
        key: &LinkageKey,
        source: SourceType,
        data: Option<&HashMap<String, String>>,
    ) -> Result<ForkOutcome> {
        let attributes = Attributes::optional(data);
        let masked = mask_attributes(&attributes, &self.pseudonymizer);

        // Records never change attributes in place, so the index pair of the
        // fork is fixed by this unleased read
        let forked_attributes = self.load(key)?.attributes.overlay(masked);

        let mut lease_keys = vec![LeaseKey::record(key)];
        if let Some((forename, dob)) = forked_attributes.index_pair() {
            lease_keys.push(LeaseKey::index(forename, dob));
        }
        let _leases = self.leases.acquire(lease_keys)?;

        let mut old = self.load(key)?;

        let mut forked = IdentityRecord::new();
        forked.documents = old.documents.clone();
        forked.counters = old.counters.clone();
        forked.attributes = forked_attributes;
        forked.gender = gender(&attributes).or_else(|| old.gender.clone());
        forked.forked_from = Some(old.key.clone());

        let previous = old.counter(source);
        forked.counters.set(source, previous.saturating_add(1));
        if let Some(document) = attributes.document(source) {
            forked
                .documents
                .set(source, Some(self.pseudonymizer.mask(document)));
        }

        if previous == 0 {
            tracing::warn!(
                key = %old.key,
                source = %source,
                "Forking a record whose source counter is already zero; flooring at zero"
            );
        }
        old.counters.set(source, previous.saturating_sub(1));

        let previous_retired = self.store.fork(&forked, &old)?;

        tracing::info!(
            previous_key = %old.key,
            new_key = %forked.key,
            previous_retired,
            "Identity forked"
        );

        Ok(ForkOutcome {
            previous_key: old.key,
            new_key: forked.key,
            previous_retired,
        })
    }

    /// Unlinks `source` from the identity at `key`, zeroing its counter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `key` does not resolve and
    /// [`Error::OperationFailed`] for store failures.
    #[instrument(skip_all, fields(action = "DELETE", key = %key, source = %source))]
    pub fn delete(&self, key: &LinkageKey, source: SourceType) -> Result<DeleteOutcome> {
        let _lease = self.leases.acquire([LeaseKey::record(key)])?;

        let mut record = self.load(key)?;
        record.counters.set(source, 0);

        if record.is_unreferenced() {
            self.store.delete(&record.key)?;
            tracing::info!(key = %record.key, "Identity removed");
            return Ok(DeleteOutcome::Removed(record.key));
        }

        self.store.put(&record)?;
        tracing::info!(key = %record.key, "Source unlinked");
        Ok(DeleteOutcome::Unlinked(IdentitySummary::of(&record)))
    }

    /// Returns the summary view of the identity at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `key` does not resolve and
    /// [`Error::OperationFailed`] for store failures.
    #[instrument(skip_all, fields(action = "SEARCH", key = %key))]
    pub fn search(&self, key: &LinkageKey) -> Result<IdentitySummary> {
        self.load(key).map(|record| IdentitySummary::of(&record))
    }

    fn load(&self, key: &LinkageKey) -> Result<IdentityRecord> {
        self.store
            .get(key)?
            .ok_or_else(|| Error::NotFound(format!("Record not found for key: {key}")))
    }
}

/// Parses a source tag.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unknown tag.
pub fn parse_source(tag: &str) -> Result<SourceType> {
    SourceType::parse(tag).ok_or_else(|| Error::Validation(format!("Invalid source: {tag}")))
}

/// Validates a prior linkage key.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the key is missing or blank.
pub fn require_key(key: Option<&str>, action: Action) -> Result<LinkageKey> {
    key.map(str::trim)
        .filter(|k| !k.is_empty())
        .map(LinkageKey::from)
        .ok_or_else(|| Error::Validation(format!("AadhaarLinkageKey required for {action}")))
}
