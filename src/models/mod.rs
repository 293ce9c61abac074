//! Data models for the linkage engine.
//!
//! This module contains the identity record, the request/response envelopes,
//! and the closed action and source tag sets.

mod action;
mod identity;
mod request;
mod source;
mod summary;

pub use action::Action;
pub use identity::{
    DocumentValues, IdentityRecord, LinkageKey, MaskedAttributes, PerSource, SourceCounters,
};
pub use request::{LinkageRequest, LinkageResponse, ResponseStatus};
pub use source::SourceType;
pub use summary::{IdentitySummary, SOURCE_NOT_AVAILABLE, counter_label};
