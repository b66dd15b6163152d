//! Pipeline-facing workers

pub mod reporter;
