//! Post-deployment validation

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::deploy::backoff::BackoffPolicy;
use crate::models::deployment::{DeploymentHandle, ValidationOutcome};
use crate::services::{bounded, DeploymentService};
use crate::validate::health::HealthProbe;

/// Post-deployment validation options
#[derive(Debug, Clone)]
pub struct Options {
    /// Application health endpoint; unset skips the check
    pub app_health_check_url: Option<Url>,

    /// Attempts and wait between application health checks
    pub health_retry: BackoffPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            app_health_check_url: None,
            health_retry: BackoffPolicy::health_retry(),
        }
    }
}

/// Gate run after the monitor has seen the deployment succeed
pub struct PostDeploymentValidator {
    deployments: Arc<dyn DeploymentService>,
    health: HealthProbe,
    options: Options,
    call_timeout: Duration,
}

impl PostDeploymentValidator {
    pub fn new(
        deployments: Arc<dyn DeploymentService>,
        health: HealthProbe,
        options: Options,
        call_timeout: Duration,
    ) -> Self {
        Self {
            deployments,
            health,
            options,
            call_timeout,
        }
    }

    /// Sequential gates; the first failure wins
    pub async fn validate(&self, handle: &DeploymentHandle) -> ValidationOutcome {
        info!("Running post-deployment validation for deployment: {}", handle);

        // 1. The deployment record must still be readable
        let status = match bounded(self.call_timeout, self.deployments.get_deployment(handle)).await
        {
            Ok(status) => status,
            Err(e) => return ValidationOutcome::fail(format!("failed to get deployment info: {}", e)),
        };

        // 2. Every target succeeded
        let target_ids = match bounded(
            self.call_timeout,
            self.deployments.list_deployment_targets(handle),
        )
        .await
        {
            Ok(ids) => ids,
            Err(e) => {
                return ValidationOutcome::fail(format!("failed to list deployment targets: {}", e))
            }
        };

        for target_id in &target_ids {
            let target = match bounded(
                self.call_timeout,
                self.deployments.get_deployment_target(handle, target_id),
            )
            .await
            {
                Ok(target) => target,
                Err(e) => {
                    return ValidationOutcome::fail(format!(
                        "failed to get target info for {}: {}",
                        target_id, e
                    ))
                }
            };

            if !target.is_succeeded() {
                return ValidationOutcome::fail(format!(
                    "deployment failed on target {} with status: {}",
                    target.target_id,
                    target.status.as_deref().unwrap_or_default()
                ));
            }
            debug!("Target {} succeeded", target.target_id);
        }

        // 3. Application health
        match &self.options.app_health_check_url {
            Some(url) => {
                if let Err(e) = self
                    .health
                    .check_with_retries(url, &self.options.health_retry)
                    .await
                {
                    return ValidationOutcome::fail(format!(
                        "application health validation failed: {}",
                        e
                    ));
                }
            }
            None => info!(
                "No application health check URL configured, skipping application health validation"
            ),
        }

        info!(
            "Post-deployment validation completed successfully: deployment {} is {} on {} targets",
            handle,
            status.state,
            target_ids.len()
        );
        ValidationOutcome::pass(format!("{} targets succeeded", target_ids.len()))
    }
}
