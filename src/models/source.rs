//! Document source types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity document sources that can be linked to an identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// Aadhaar card.
    #[serde(alias = "aadhaar", alias = "AADHAAR")]
    Aadhaar,
    /// Permanent Account Number card.
    #[serde(rename = "PAN", alias = "pan", alias = "Pan")]
    Pan,
    /// Voter ID card.
    #[serde(alias = "voter", alias = "VOTER")]
    Voter,
    /// Driving License.
    #[serde(alias = "driving", alias = "DRIVING")]
    Driving,
}

impl SourceType {
    /// Returns all source variants in counter order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Aadhaar, Self::Pan, Self::Voter, Self::Driving]
    }

    /// Returns the canonical source tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aadhaar => "Aadhaar",
            Self::Pan => "PAN",
            Self::Voter => "Voter",
            Self::Driving => "Driving",
        }
    }

    /// Returns the attribute name carrying this source's document number.
    #[must_use]
    pub const fn document_attribute(&self) -> &'static str {
        match self {
            Self::Aadhaar => "aadhaar_number",
            Self::Pan => "pan_number",
            Self::Voter => "voter_id",
            Self::Driving => "dl_number",
        }
    }

    /// Returns the summary field name of this source's counter.
    #[must_use]
    pub const fn counter_label(&self) -> &'static str {
        match self {
            Self::Aadhaar => "aadhaarCounter",
            Self::Pan => "panCounter",
            Self::Voter => "voterIdCounter",
            Self::Driving => "dlCounter",
        }
    }

    /// Position of this source in per-source arrays.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Aadhaar => 0,
            Self::Pan => 1,
            Self::Voter => 2,
            Self::Driving => 3,
        }
    }

    /// Parses a source tag (case-insensitive, trimmed).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aadhaar" | "aadhar" => Some(Self::Aadhaar),
            "pan" => Some(Self::Pan),
            "voter" | "voter_id" | "voterid" | "voter-id" => Some(Self::Voter),
            "driving" | "dl" | "driving_license" | "driving-license" | "drivinglicense" => {
                Some(Self::Driving)
            },
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
