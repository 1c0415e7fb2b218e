//! # inboxkit Domain
//!
//! Domain types shared by every inboxkit crate.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other inboxkit crates
//! - Only external dependencies allowed

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
