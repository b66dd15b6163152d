//! External collaborators the handler drives
//!
//! Each collaborator is a trait so the handler can be built once with real
//! clients at process start and with in-memory fakes in tests.

#[cfg(feature = "aws")]
pub mod aws;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::deploy::fsm::DeploymentState;
use crate::errors::ServiceError;
use crate::models::deployment::{
    DeploymentHandle, DeploymentRequest, DeploymentStatus, TargetStatus,
};

/// Blue/green or canary deployment service
#[async_trait]
pub trait DeploymentService: Send + Sync {
    /// Succeeds when the application and deployment group exist
    async fn get_deployment_group(
        &self,
        application_name: &str,
        deployment_group_name: &str,
    ) -> Result<(), ServiceError>;

    /// Deployments of a group currently in one of `statuses`
    async fn list_deployments(
        &self,
        application_name: &str,
        deployment_group_name: &str,
        statuses: &[DeploymentState],
    ) -> Result<Vec<DeploymentHandle>, ServiceError>;

    /// Submit a deployment
    async fn create_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeploymentHandle, ServiceError>;

    /// Current status of a deployment
    async fn get_deployment(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<DeploymentStatus, ServiceError>;

    /// Target ids touched by a deployment
    async fn list_deployment_targets(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<Vec<String>, ServiceError>;

    /// Outcome of a deployment on one target
    async fn get_deployment_target(
        &self,
        handle: &DeploymentHandle,
        target_id: &str,
    ) -> Result<TargetStatus, ServiceError>;
}

/// Object storage holding build artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// HEAD-style probe; `Ok(false)` when the object does not exist
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ServiceError>;
}

/// Secret storage
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, reference: &str) -> Result<SecretString, ServiceError>;
}

/// The pipeline controller that invoked the handler
#[async_trait]
pub trait PipelineController: Send + Sync {
    /// Mark the job successful. `summary` is shown in the pipeline console and
    /// `external_id` links the job to the deployment it drove.
    async fn put_job_success(
        &self,
        job_id: &str,
        summary: &str,
        external_id: Option<&str>,
    ) -> Result<(), ServiceError>;

    /// Mark the job failed with a human-readable message
    async fn put_job_failure(&self, job_id: &str, message: &str) -> Result<(), ServiceError>;
}

/// The full set of clients, constructed once and shared across invocations
#[derive(Clone)]
pub struct Clients {
    pub deployments: Arc<dyn DeploymentService>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub controller: Arc<dyn PipelineController>,
}

/// Run one external call under a timeout
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(timeout)),
    }
}
