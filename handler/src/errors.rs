//! Error types for the deployment-trigger handler

use std::time::Duration;

use thiserror::Error;

use crate::models::deployment::DeploymentHandle;

/// Main error type for one handler invocation
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to {operation} after {attempts} attempts: {message}")]
    Transient {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("Deployment {handle} {detail}")]
    DeploymentOutcome {
        handle: DeploymentHandle,
        detail: String,
    },

    #[error("Timed out after {waited:?} waiting on deployment {handle}")]
    Timeout {
        handle: DeploymentHandle,
        waited: Duration,
    },

    #[error("Reporting error: {0}")]
    Reporting(String),
}

/// Failure of a single call to an external collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Transient(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}
