//! Request gateway.
//!
//! Accepts external requests as typed values or JSON text, checks the fields
//! every request needs, forwards them to the [`LinkageService`] and returns
//! the response envelope.

use crate::models::{LinkageRequest, LinkageResponse};
use crate::security::Pseudonymizer;
use crate::services::LinkageService;
use crate::storage::IdentityStore;
use crate::{Error, Result};
use std::io::{BufRead, Write};
use tracing::instrument;

/// Counts from a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Requests processed.
    pub processed: usize,
    /// Requests answered with SUCCESS.
    pub succeeded: usize,
    /// Requests answered with ERROR.
    pub rejected: usize,
}

/// Front door of the linkage engine.
pub struct LinkageGateway<S, P> {
    service: LinkageService<S, P>,
}

impl<S: IdentityStore, P: Pseudonymizer> LinkageGateway<S, P> {
    /// Creates a gateway over a linkage service.
    #[must_use]
    pub const fn new(service: LinkageService<S, P>) -> Self {
        Self { service }
    }

    /// Returns the underlying service.
    #[must_use]
    pub const fn service(&self) -> &LinkageService<S, P> {
        &self.service
    }

    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store or a lease fails.
    #[instrument(skip_all, fields(action = %request.action, source = %request.source))]
    pub fn handle(&self, request: &LinkageRequest) -> Result<LinkageResponse> {
        if request.action.trim().is_empty() {
            return Ok(LinkageResponse::error("Action must be provided"));
        }
        if request.source.trim().is_empty() {
            return Ok(LinkageResponse::error("Source must be provided"));
        }
        self.service.process(request)
    }

    /// Handles one JSON-encoded request and returns the JSON response.
    ///
    /// Malformed JSON is answered with an ERROR response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store or a lease fails.
    pub fn handle_json(&self, body: &str) -> Result<String> {
        to_json(&self.respond(body)?)
    }

    fn respond(&self, body: &str) -> Result<LinkageResponse> {
        match serde_json::from_str::<LinkageRequest>(body) {
            Ok(request) => self.handle(&request),
            Err(e) => {
                tracing::debug!(error = %e, "Malformed request body");
                Ok(LinkageResponse::error(format!("Malformed request: {e}")))
            },
        }
    }

    /// Processes newline-delimited JSON requests, writing one response line
    /// per non-blank input line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] on I/O failure or a fatal engine
    /// error; responses already written stay written.
    pub fn process_lines<R: BufRead, W: Write>(
        &self,
        reader: R,
        mut writer: W,
    ) -> Result<BatchStats> {
        let mut stats = BatchStats::default();

        for line in reader.lines() {
            let line = line.map_err(|e| Error::OperationFailed {
                operation: "read_request".to_string(),
                cause: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let response = self.respond(&line)?;
            stats.processed += 1;
            if response.is_success() {
                stats.succeeded += 1;
            } else {
                stats.rejected += 1;
            }

            writeln!(writer, "{}", to_json(&response)?).map_err(|e| Error::OperationFailed {
                operation: "write_response".to_string(),
                cause: e.to_string(),
            })?;
        }

        writer.flush().map_err(|e| Error::OperationFailed {
            operation: "write_response".to_string(),
            cause: e.to_string(),
        })?;

        tracing::info!(
            processed = stats.processed,
            succeeded = stats.succeeded,
            rejected = stats.rejected,
            "Batch complete"
        );
        Ok(stats)
    }
}

fn to_json(response: &LinkageResponse) -> Result<String> {
    serde_json::to_string(response).map_err(|e| Error::OperationFailed {
        operation: "serialize_response".to_string(),
        cause: e.to_string(),
    })
}
