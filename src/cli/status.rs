//! Status command report.

use crate::Result;
use crate::models::SourceType;
use crate::security::Pseudonymizer;
use crate::storage::IdentityStore;
use std::fmt;

/// Identity store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Store backend name.
    pub backend: &'static str,
    /// Store location, if on disk.
    pub location: Option<String>,
    /// Pseudonymizer name.
    pub pseudonymizer: &'static str,
    /// Number of stored records.
    pub records: usize,
    /// Records linked to each source, in [`SourceType::all`] order.
    pub linked: [usize; 4],
    /// Records created by an UPDATE fork.
    pub forked: usize,
}

impl StatusReport {
    /// Collects statistics by scanning the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn collect<S, P>(store: &S, pseudonymizer: &P, location: Option<String>) -> Result<Self>
    where
        S: IdentityStore + ?Sized,
        P: Pseudonymizer + ?Sized,
    {
        let mut report = Self {
            backend: store.name(),
            location,
            pseudonymizer: pseudonymizer.name(),
            records: 0,
            linked: [0; 4],
            forked: 0,
        };

        for key in store.list_keys()? {
            // Keys can disappear between listing and reading
            let Some(record) = store.get(&key)? else {
                continue;
            };
            report.records += 1;
            if record.forked_from.is_some() {
                report.forked += 1;
            }
            for source in SourceType::all() {
                if record.counter(*source) > 0 {
                    report.linked[source.index()] += 1;
                }
            }
        }

        Ok(report)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Aadhaar Linkage Status")?;
        writeln!(f, "======================")?;
        writeln!(f, "Backend:       {}", self.backend)?;
        if let Some(location) = &self.location {
            writeln!(f, "Location:      {location}")?;
        }
        writeln!(f, "Pseudonymizer: {}", self.pseudonymizer)?;
        writeln!(f, "Records:       {}", self.records)?;
        writeln!(f, "Forked:        {}", self.forked)?;
        writeln!(f)?;
        write!(f, "Linked records by source:")?;
        for source in SourceType::all() {
            write!(f, "\n  {:<8} {}", source.as_str(), self.linked[source.index()])?;
        }
        Ok(())
    }
}
