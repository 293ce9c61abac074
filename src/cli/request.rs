//! Building gateway requests from command-line arguments.

use crate::models::{Action, LinkageRequest};
use crate::{Error, Result};
use std::collections::HashMap;

/// Parses `key=value` arguments into an attribute map.
///
/// Returns `None` when no arguments were given. Later duplicates win.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an entry without `=` or with an empty key.
pub fn parse_data(entries: &[String]) -> Result<Option<HashMap<String, String>>> {
    if entries.is_empty() {
        return Ok(None);
    }

    entries
        .iter()
        .map(|entry| {
            let (key, value) = entry
                .split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .ok_or_else(|| {
                    Error::Validation(format!("Invalid data entry '{entry}': expected key=value"))
                })?;
            Ok((key.trim().to_string(), value.to_string()))
        })
        .collect::<Result<HashMap<_, _>>>()
        .map(Some)
}

/// Builds a request for `action`.
///
/// SEARCH does not name a source on the command line; the request carries
/// `Aadhaar` so it passes the gateway's field check.
///
/// # Errors
///
/// Returns [`Error::Validation`] if a data entry is malformed.
pub fn build_request(
    action: Action,
    source: Option<&str>,
    key: Option<&str>,
    data: &[String],
) -> Result<LinkageRequest> {
    let source = source.unwrap_or("Aadhaar");
    let mut request = LinkageRequest::new(action.as_str(), source);
    request.data = parse_data(data)?;
    request.prior_key = key.map(str::to_string);
    Ok(request)
}
