//! Security features.
//!
//! Pseudonymization of personal attributes before storage and comparison.

mod pseudonymizer;

pub use pseudonymizer::{HmacPseudonymizer, Pseudonymizer, Sha256Pseudonymizer, normalize};
