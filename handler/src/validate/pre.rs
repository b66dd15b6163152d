//! Pre-deployment validation

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::deploy::fsm::DeploymentState;
use crate::errors::ServiceError;
use crate::models::deployment::ValidationOutcome;
use crate::models::job::DeploymentJob;
use crate::services::{bounded, ArtifactStore, DeploymentService};
use crate::validate::health::HealthProbe;

/// Pre-deployment validation options
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Infrastructure health endpoint; unset skips the check
    pub health_check_url: Option<Url>,
}

/// Gate run before any deployment is submitted
pub struct PreDeploymentValidator {
    deployments: Arc<dyn DeploymentService>,
    artifacts: Arc<dyn ArtifactStore>,
    health: HealthProbe,
    options: Options,
    call_timeout: Duration,
}

impl PreDeploymentValidator {
    pub fn new(
        deployments: Arc<dyn DeploymentService>,
        artifacts: Arc<dyn ArtifactStore>,
        health: HealthProbe,
        options: Options,
        call_timeout: Duration,
    ) -> Self {
        Self {
            deployments,
            artifacts,
            health,
            options,
            call_timeout,
        }
    }

    /// Run every check in order, stopping at the first fatal one
    pub async fn validate(&self, job: &DeploymentJob) -> ValidationOutcome {
        info!(
            "Running pre-deployment validation for {}/{}",
            job.application_name, job.deployment_group_name
        );

        // 1. Application and deployment group exist
        if let Err(e) = bounded(
            self.call_timeout,
            self.deployments
                .get_deployment_group(&job.application_name, &job.deployment_group_name),
        )
        .await
        {
            return ValidationOutcome::fail(format!("deployment group validation failed: {}", e));
        }

        // 2. Artifact is reachable
        if let Some(artifact) = &job.artifact {
            match bounded(
                self.call_timeout,
                self.artifacts.object_exists(&artifact.bucket, &artifact.key),
            )
            .await
            {
                Ok(true) => {}
                Ok(false) => {
                    return ValidationOutcome::fail(format!(
                        "artifact validation failed: {}",
                        ServiceError::NotFound(format!("s3://{}/{}", artifact.bucket, artifact.key))
                    ));
                }
                Err(e) => {
                    return ValidationOutcome::fail(format!("artifact validation failed: {}", e));
                }
            }
        }

        // 3. Advisory only: concurrent deployments are not serialized here
        match bounded(
            self.call_timeout,
            self.deployments.list_deployments(
                &job.application_name,
                &job.deployment_group_name,
                &DeploymentState::IN_FLIGHT,
            ),
        )
        .await
        {
            Ok(in_flight) if !in_flight.is_empty() => {
                warn!(
                    "There are {} in-progress deployments for this group",
                    in_flight.len()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Could not check for in-progress deployments: {}", e),
        }

        // 4. Infrastructure health
        match &self.options.health_check_url {
            Some(url) => match self.health.check(url).await {
                Ok(status) => info!(
                    "Infrastructure validation succeeded: health check returned {}",
                    status
                ),
                Err(e) => {
                    return ValidationOutcome::fail(format!(
                        "infrastructure validation failed: {}",
                        e
                    ));
                }
            },
            None => info!("No health check URL configured, skipping infrastructure validation"),
        }

        info!("Pre-deployment validation completed successfully");
        ValidationOutcome::pass("pre-deployment checks passed")
    }
}
