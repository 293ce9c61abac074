//! Attribute extraction, validation and masking for linkage requests.

use crate::models::{Action, MaskedAttributes, SourceType};
use crate::security::Pseudonymizer;
use crate::{Error, Result};
use std::collections::HashMap;

/// Forename attribute name.
pub const FORENAME: &str = "forename";
/// Second name attribute name.
pub const SECONDNAME: &str = "secondname";
/// Last name attribute name.
pub const LASTNAME: &str = "lastname";
/// Date of birth attribute name.
pub const DOB: &str = "dob";
/// Address attribute name.
pub const ADDRESS: &str = "address";
/// Gender attribute name.
pub const GENDER: &str = "gender";

/// Read-only view over a raw attribute map.
///
/// Names match case-insensitively; blank values count as absent.
#[derive(Debug, Clone, Copy)]
pub struct Attributes<'a> {
    data: Option<&'a HashMap<String, String>>,
}

impl<'a> Attributes<'a> {
    /// Validates that `data` is present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the map is missing or empty.
    pub fn require(data: Option<&'a HashMap<String, String>>, action: Action) -> Result<Self> {
        match data {
            Some(data) if !data.is_empty() => Ok(Self { data: Some(data) }),
            _ => Err(Error::Validation(format!("Data is required for {action}"))),
        }
    }

    /// Wraps a map that may be missing; a missing map has no attributes.
    #[must_use]
    pub const fn optional(data: Option<&'a HashMap<String, String>>) -> Self {
        Self { data }
    }

    /// Returns a non-blank attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let data = self.data?;
        data.get(name)
            .or_else(|| {
                data.iter()
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns the document number submitted for a source.
    #[must_use]
    pub fn document(&self, source: SourceType) -> Option<&'a str> {
        self.get(source.document_attribute())
    }

    /// Returns the raw (forename, dob) pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first missing attribute.
    pub fn index_pair(&self, action: Action) -> Result<(&'a str, &'a str)> {
        let forename = self
            .get(FORENAME)
            .ok_or_else(|| Error::Validation(format!("{FORENAME} is required for {action}")))?;
        let dob = self
            .get(DOB)
            .ok_or_else(|| Error::Validation(format!("{DOB} is required for {action}")))?;
        Ok((forename, dob))
    }
}

/// A masked (forename, dob) index pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedIndex {
    /// Masked forename.
    pub forename: String,
    /// Masked date of birth.
    pub dob: String,
}

impl MaskedIndex {
    /// Masks the request's (forename, dob) pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if forename or dob is missing.
    pub fn from_attributes<P: Pseudonymizer + ?Sized>(
        attributes: &Attributes<'_>,
        action: Action,
        pseudonymizer: &P,
    ) -> Result<Self> {
        let (forename, dob) = attributes.index_pair(action)?;
        Ok(Self {
            forename: pseudonymizer.mask(forename),
            dob: pseudonymizer.mask(dob),
        })
    }
}

/// Masks every personal attribute of a request.
#[must_use]
pub fn mask_attributes<P: Pseudonymizer + ?Sized>(
    attributes: &Attributes<'_>,
    pseudonymizer: &P,
) -> MaskedAttributes {
    MaskedAttributes {
        forename: pseudonymizer.mask_opt(attributes.get(FORENAME)),
        secondname: pseudonymizer.mask_opt(attributes.get(SECONDNAME)),
        lastname: pseudonymizer.mask_opt(attributes.get(LASTNAME)),
        dob: pseudonymizer.mask_opt(attributes.get(DOB)),
        address: pseudonymizer.mask_opt(attributes.get(ADDRESS)),
    }
}

/// Returns the plain gender attribute, trimmed.
#[must_use]
pub fn gender(attributes: &Attributes<'_>) -> Option<String> {
    attributes.get(GENDER).map(|g| g.trim().to_string())
}
