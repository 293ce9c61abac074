//! Gateway request and response envelopes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An external linkage request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkageRequest {
    /// Action tag: INSERT | UPDATE | DELETE | SEARCH.
    #[serde(default)]
    pub action: String,
    /// Source tag: Aadhaar | PAN | Voter | Driving.
    #[serde(default)]
    pub source: String,
    /// Raw person attributes.
    #[serde(default)]
    pub data: Option<HashMap<String, String>>,
    /// Linkage key of an existing record (UPDATE/DELETE/SEARCH).
    #[serde(default, alias = "oldAadhaarLinkageKey")]
    pub prior_key: Option<String>,
}

impl LinkageRequest {
    /// Creates a request with the given action and source.
    #[must_use]
    pub fn new(action: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    /// Adds a raw attribute to the data map.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replaces the data map.
    #[must_use]
    pub fn with_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the prior linkage key.
    #[must_use]
    pub fn with_prior_key(mut self, key: impl Into<String>) -> Self {
        self.prior_key = Some(key.into());
        self
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    /// The request was applied.
    Success,
    /// The request was rejected.
    Error,
}

/// Response envelope returned to the gateway caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageResponse {
    /// Outcome status.
    pub status: ResponseStatus,
    /// Human-readable message.
    pub message: String,
    /// Summary view or `{ "newKey": .. }`; absent on errors.
    pub data: Option<serde_json::Value>,
}

impl LinkageResponse {
    /// Creates a success response with a payload.
    #[must_use]
    pub fn success(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Creates an error response without payload.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for SUCCESS responses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Returns a string field of the payload, if present.
    #[must_use]
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data.as_ref()?.get(field)?.as_str()
    }
}
