//! Deployment models

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::deploy::fsm::DeploymentState;
use crate::errors::HandlerError;
use crate::models::job::ArtifactReference;

/// Identifier returned by the deployment service for one deployment attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentHandle(String);

impl DeploymentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deployment submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub application_name: String,
    pub deployment_group_name: String,

    /// Revision to deploy; `None` lets the service use the group's current revision
    pub revision: Option<ArtifactReference>,

    pub description: String,
}

/// Current status of a deployment as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub state: DeploymentState,

    /// Error detail, usually only present for failed deployments
    pub error_message: Option<String>,
}

impl DeploymentStatus {
    pub fn new(state: DeploymentState) -> Self {
        Self {
            state,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: DeploymentState::Failed,
            error_message: Some(message.into()),
        }
    }
}

/// Per-target outcome of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetStatus {
    pub target_id: String,

    /// Target-level status string; `None` when the service reports none
    pub status: Option<String>,
}

impl TargetStatus {
    pub const SUCCEEDED: &'static str = "Succeeded";

    pub fn is_succeeded(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == Self::SUCCEEDED)
    }
}

/// Result of a validation gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub reason: String,
}

impl ValidationOutcome {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }

    /// A failed gate becomes a validation error, never a retryable one
    pub fn into_result(self) -> Result<(), HandlerError> {
        if self.passed {
            Ok(())
        } else {
            Err(HandlerError::Validation(self.reason))
        }
    }
}
