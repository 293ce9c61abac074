//! Pseudonymization of personal attributes.
//!
//! Every PII attribute is normalized (trimmed, lowercased) and passed through a
//! deterministic one-way function before it is stored or compared. Equal inputs
//! always produce equal masks, so masked values can be used as lookup keys.

use crate::{Error, Result};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

/// HMAC-SHA256 type alias.
type HmacSha256 = Hmac<Sha256>;

/// Normalizes a raw attribute before masking.
///
/// # Example
///
/// ```rust
/// use aadhaar_linkage::security::normalize;
///
/// assert_eq!(normalize("  Asha "), "asha");
/// ```
#[must_use]
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Deterministic one-way masking of normalized attributes.
///
/// Implementations only need [`Pseudonymizer::pseudonymize`]; callers use
/// [`Pseudonymizer::mask`], which normalizes first.
pub trait Pseudonymizer: Send + Sync {
    /// Returns the pseudonymizer name (for logs and status output).
    fn name(&self) -> &'static str;

    /// Masks an already-normalized value.
    fn pseudonymize(&self, normalized: &str) -> String;

    /// Normalizes and masks a raw value.
    fn mask(&self, raw: &str) -> String {
        self.pseudonymize(&normalize(raw))
    }

    /// Masks an optional raw value.
    fn mask_opt(&self, raw: Option<&str>) -> Option<String> {
        raw.map(|value| self.mask(value))
    }
}

impl<P: Pseudonymizer + ?Sized> Pseudonymizer for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn pseudonymize(&self, normalized: &str) -> String {
        (**self).pseudonymize(normalized)
    }
}

/// Unkeyed SHA-256 pseudonymizer producing 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Pseudonymizer;

impl Pseudonymizer for Sha256Pseudonymizer {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn pseudonymize(&self, normalized: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Keyed HMAC-SHA256 pseudonymizer.
///
/// Without the secret pepper, masks cannot be recomputed from guessed inputs,
/// which matters for low-entropy attributes such as dates of birth.
#[derive(Clone)]
pub struct HmacPseudonymizer {
    mac: HmacSha256,
}

impl HmacPseudonymizer {
    /// Creates a keyed pseudonymizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the secret is empty.
    pub fn new(secret: &SecretString) -> Result<Self> {
        let key = secret.expose_secret();
        if key.trim().is_empty() {
            return Err(Error::OperationFailed {
                operation: "init_hmac_pseudonymizer".to_string(),
                cause: "pseudonymization secret is empty".to_string(),
            });
        }

        let mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| {
            Error::OperationFailed {
                operation: "init_hmac_pseudonymizer".to_string(),
                cause: e.to_string(),
            }
        })?;

        Ok(Self { mac })
    }
}

impl fmt::Debug for HmacPseudonymizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacPseudonymizer").finish_non_exhaustive()
    }
}

impl Pseudonymizer for HmacPseudonymizer {
    fn name(&self) -> &'static str {
        "hmac-sha256"
    }

    fn pseudonymize(&self, normalized: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(normalized.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Asha"), "asha");
        assert_eq!(normalize("\t1990-01-01 \n"), "1990-01-01");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_sha256_is_deterministic_and_normalized() {
        let p = Sha256Pseudonymizer;
        let a = p.mask("Asha");
        let b = p.mask("  ASHA ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, p.mask("Ashok"));
    }

    #[test]
    fn test_sha256_known_vector() {
        // sha256("abc")
        assert_eq!(
            Sha256Pseudonymizer.pseudonymize("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hmac_depends_on_secret() {
        let p1 = HmacPseudonymizer::new(&SecretString::from("pepper-one")).unwrap();
        let p2 = HmacPseudonymizer::new(&SecretString::from("pepper-two")).unwrap();

        assert_eq!(p1.mask("Asha"), p1.mask(" asha"));
        assert_ne!(p1.mask("Asha"), p2.mask("Asha"));
        assert_ne!(p1.mask("Asha"), Sha256Pseudonymizer.mask("Asha"));
        assert_eq!(p1.mask("Asha").len(), 64);
    }

    #[test]
    fn test_hmac_rejects_empty_secret() {
        let result = HmacPseudonymizer::new(&SecretString::from("  "));
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_hmac_debug_hides_key() {
        let p = HmacPseudonymizer::new(&SecretString::from("pepper")).unwrap();
        assert!(!format!("{p:?}").contains("pepper"));
    }

    #[test]
    fn test_mask_opt() {
        let p = Sha256Pseudonymizer;
        assert!(p.mask_opt(None).is_none());
        assert_eq!(p.mask_opt(Some("x")), Some(p.mask("x")));
    }
}
