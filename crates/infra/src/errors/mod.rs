//! Error conversions into [`inboxkit_domain::InboxKitError`].

pub mod conversions;

pub use conversions::InfraError;
