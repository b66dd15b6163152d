//! Deployment submission with bounded retry

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::deploy::backoff::BackoffPolicy;
use crate::errors::HandlerError;
use crate::models::deployment::{DeploymentHandle, DeploymentRequest};
use crate::services::{bounded, DeploymentService};

/// Submits deployments to the deployment service
pub struct DeploymentDriver {
    deployments: Arc<dyn DeploymentService>,
    policy: BackoffPolicy,
    call_timeout: Duration,
}

impl DeploymentDriver {
    pub fn new(
        deployments: Arc<dyn DeploymentService>,
        policy: BackoffPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            deployments,
            policy,
            call_timeout,
        }
    }

    /// Submit `request`, retrying failed submissions with backoff
    pub async fn submit(&self, request: &DeploymentRequest) -> Result<DeploymentHandle, HandlerError> {
        if request.revision.is_none() {
            warn!("No artifact location available, continuing without revision specification");
        }

        let mut backoff = self.policy.start();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let wait = backoff.next_delay();
            info!("Creating deployment (attempt {}): {}", attempt, request.description);

            match bounded(self.call_timeout, self.deployments.create_deployment(request)).await {
                Ok(handle) => {
                    info!("Successfully created deployment: {}", handle);
                    return Ok(handle);
                }
                Err(e) if backoff.exhausted() => {
                    return Err(HandlerError::Transient {
                        operation: "create deployment".to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        "Failed to create deployment (attempt {}): {}, retrying in {:?}",
                        attempt, e, wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
