//! External service integrations

pub mod gmail;
