//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory implementations of the crate's traits
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-utils` feature.

pub mod mocks;

pub use mocks::MemorySecretStore;
