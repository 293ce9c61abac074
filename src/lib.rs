//! # Aadhaar Linkage
//!
//! Resolves identity-document submissions (Aadhaar, PAN, Voter ID, Driving License)
//! that belong to the same person into a single pseudonymized identity record, and
//! tracks per document source how many active linkages reference that identity.
//!
//! ## Features
//!
//! - Deterministic pseudonymization of every PII attribute before storage or comparison
//! - Deduplication on the masked (forename, date of birth) pair
//! - Per-source reference counting with copy-on-write forking on update
//! - Pluggable identity stores (`SQLite`, in-memory)
//! - JSON request gateway and CLI
//!
//! ## Example
//!
//! ```rust,ignore
//! use aadhaar_linkage::{InMemoryIdentityStore, LinkageService, Sha256Pseudonymizer};
//! use aadhaar_linkage::models::{LinkageRequest, SourceType};
//!
//! let service = LinkageService::new(InMemoryIdentityStore::new(), Sha256Pseudonymizer);
//! let response = service.process(
//!     &LinkageRequest::new("INSERT", "Aadhaar")
//!         .with_attribute("forename", "Asha")
//!         .with_attribute("dob", "1990-01-01")
//!         .with_attribute("aadhaar_number", "1234"),
//! )?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;

pub use config::LinkageConfig;
pub use gateway::LinkageGateway;
pub use models::{
    Action, IdentityRecord, IdentitySummary, LinkageKey, LinkageRequest, LinkageResponse,
    SourceType,
};
pub use security::{HmacPseudonymizer, Pseudonymizer, Sha256Pseudonymizer};
pub use services::LinkageService;
pub use storage::{IdentityStore, InMemoryIdentityStore, SqliteIdentityStore};

/// Error type for linkage operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | Surfaced As |
/// |---------|-------------|-------------|
/// | `Validation` | Missing/invalid action, source, data or key | ERROR response |
/// | `NotFound` | A linkage key does not resolve to a record | ERROR response |
/// | `OperationFailed` | Store, lease, config or I/O failure | Fatal `Err` |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The request is malformed.
    ///
    /// Raised when:
    /// - The action tag is not one of INSERT/UPDATE/DELETE/SEARCH
    /// - The source tag is not a known document source
    /// - INSERT or UPDATE carries no data, or data without forename/dob
    /// - UPDATE/DELETE/SEARCH carries no prior linkage key
    #[error("{0}")]
    Validation(String),

    /// A linkage key did not resolve to a stored record.
    #[error("{0}")]
    NotFound(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements or transactions fail
    /// - A lease cannot be acquired in time
    /// - Configuration or log files cannot be read or opened
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true if the error is recovered locally as an ERROR response.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Result type alias for linkage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("Invalid action: MERGE".to_string());
        assert_eq!(err.to_string(), "Invalid action: MERGE");

        let err = Error::NotFound("Record not found for key: k1".to_string());
        assert_eq!(err.to_string(), "Record not found for key: k1");

        let err = Error::OperationFailed {
            operation: "put_identity".to_string(),
            cause: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'put_identity' failed: disk full");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(Error::Validation(String::new()).is_recoverable());
        assert!(Error::NotFound(String::new()).is_recoverable());
        assert!(
            !Error::OperationFailed {
                operation: "get_identity".to_string(),
                cause: "locked".to_string(),
            }
            .is_recoverable()
        );
    }
}
