//! Credential resolution

pub mod secret;
