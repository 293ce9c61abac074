//! Summary view of an identity record.

use super::{IdentityRecord, LinkageKey, SourceType};
use serde::Serialize;

/// Rendered in place of a zero counter.
pub const SOURCE_NOT_AVAILABLE: &str = "source not available";

/// Per-source counter view returned to callers.
///
/// Counters render as their decimal count when positive and as
/// [`SOURCE_NOT_AVAILABLE`] when zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySummary {
    /// Linkage key of the record.
    #[serde(rename = "aadhaarLinkageKey")]
    pub key: LinkageKey,
    /// Aadhaar counter view.
    #[serde(rename = "aadhaarCounter")]
    pub aadhaar: String,
    /// PAN counter view.
    #[serde(rename = "panCounter")]
    pub pan: String,
    /// Voter ID counter view.
    #[serde(rename = "voterIdCounter")]
    pub voter_id: String,
    /// Driving License counter view.
    #[serde(rename = "dlCounter")]
    pub dl: String,
}

impl IdentitySummary {
    /// Builds the summary view of a record.
    #[must_use]
    pub fn of(record: &IdentityRecord) -> Self {
        Self {
            key: record.key.clone(),
            aadhaar: counter_label(record.counter(SourceType::Aadhaar)),
            pan: counter_label(record.counter(SourceType::Pan)),
            voter_id: counter_label(record.counter(SourceType::Voter)),
            dl: counter_label(record.counter(SourceType::Driving)),
        }
    }

    /// Returns the rendered counter for a source.
    #[must_use]
    pub fn counter(&self, source: SourceType) -> &str {
        match source {
            SourceType::Aadhaar => &self.aadhaar,
            SourceType::Pan => &self.pan,
            SourceType::Voter => &self.voter_id,
            SourceType::Driving => &self.dl,
        }
    }

    /// Converts the summary into a JSON payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(5);
        map.insert(
            "aadhaarLinkageKey".to_string(),
            serde_json::Value::from(self.key.as_str()),
        );
        for source in SourceType::all() {
            map.insert(
                source.counter_label().to_string(),
                serde_json::Value::from(self.counter(*source)),
            );
        }
        serde_json::Value::Object(map)
    }
}

/// Renders a counter for the summary view.
#[must_use]
pub fn counter_label(count: u32) -> String {
    if count == 0 {
        SOURCE_NOT_AVAILABLE.to_string()
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_label() {
        assert_eq!(counter_label(0), SOURCE_NOT_AVAILABLE);
        assert_eq!(counter_label(1), "1");
        assert_eq!(counter_label(12), "12");
    }

    #[test]
    fn test_summary_of_record() {
        let mut record = IdentityRecord::with_key(LinkageKey::new("k1"));
        record.counters.set(SourceType::Aadhaar, 1);
        record.counters.set(SourceType::Pan, 2);

        let summary = IdentitySummary::of(&record);
        assert_eq!(summary.key.as_str(), "k1");
        assert_eq!(summary.counter(SourceType::Aadhaar), "1");
        assert_eq!(summary.counter(SourceType::Pan), "2");
        assert_eq!(summary.counter(SourceType::Voter), SOURCE_NOT_AVAILABLE);
        assert_eq!(summary.counter(SourceType::Driving), SOURCE_NOT_AVAILABLE);
    }

    #[test]
    fn test_summary_json_matches_serde() {
        let mut record = IdentityRecord::with_key(LinkageKey::new("k2"));
        record.counters.set(SourceType::Driving, 4);
        let summary = IdentitySummary::of(&record);

        let json = summary.to_json();
        assert_eq!(json, serde_json::to_value(&summary).unwrap());
        assert_eq!(json["aadhaarLinkageKey"], "k2");
        assert_eq!(json["dlCounter"], "4");
        assert_eq!(json["voterIdCounter"], SOURCE_NOT_AVAILABLE);
    }
}
