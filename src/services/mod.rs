//! Business logic services.
//!
//! Services orchestrate the identity store and provide the linkage operations.

pub mod lease;
pub mod linkage;
pub mod matching;

pub use lease::{DEFAULT_LEASE_TIMEOUT, LeaseGuard, LeaseKey, LeaseTable};
pub use linkage::{
    DeleteOutcome, ForkOutcome, InsertKind, InsertOutcome, LinkageOutcome, LinkageService,
    parse_source, require_key,
};
pub use matching::{Attributes, MaskedIndex};
