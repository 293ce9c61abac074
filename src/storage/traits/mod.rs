//! Storage backend traits.

mod identity;

pub use identity::IdentityStore;
