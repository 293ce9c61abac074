//! Request action tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Linkage engine actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Link a source to a matching identity, creating one if needed.
    Insert,
    /// Fork an identity with new attributes.
    Update,
    /// Unlink a source from an identity.
    Delete,
    /// Look up an identity by key.
    Search,
}

impl Action {
    /// Returns the action tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Search => "SEARCH",
        }
    }

    /// Parses an action tag (case-insensitive, trimmed).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "SEARCH" => Some(Self::Search),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
