//! Deployment status polling

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::deploy::backoff::BackoffPolicy;
use crate::deploy::fsm::{DeploymentFsm, DeploymentState, Observation};
use crate::errors::HandlerError;
use crate::models::deployment::DeploymentHandle;
use crate::services::{bounded, DeploymentService};

/// Default time to wait for a deployment to settle
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Detail used when a failed deployment carries no error information
pub const NO_ERROR_INFORMATION: &str = "No error information available";

/// Monitor options
#[derive(Debug, Clone)]
pub struct Options {
    /// Wall-clock limit on polling
    pub max_wait: Duration,

    /// Wait between polls that observe a non-terminal state
    pub poll_backoff: BackoffPolicy,

    /// Wait and attempt budget for consecutive failed status queries
    pub query_retry: BackoffPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            poll_backoff: BackoffPolicy::status_poll(),
            query_retry: BackoffPolicy::status_query_retry(),
        }
    }
}

/// Polls a deployment until it settles or the deadline passes
pub struct DeploymentMonitor {
    deployments: Arc<dyn DeploymentService>,
    options: Options,
    call_timeout: Duration,
}

impl DeploymentMonitor {
    pub fn new(
        deployments: Arc<dyn DeploymentService>,
        options: Options,
        call_timeout: Duration,
    ) -> Self {
        Self {
            deployments,
            options,
            call_timeout,
        }
    }

    /// Wait for `handle` to reach a terminal state.
    ///
    /// Polling stops at `max_wait` from now, or earlier at `hard_deadline`
    /// when the caller has its own execution limit. Returns `Ok` only after
    /// observing `Succeeded`.
    pub async fn wait_for_completion(
        &self,
        handle: &DeploymentHandle,
        hard_deadline: Option<Instant>,
    ) -> Result<DeploymentState, HandlerError> {
        let started = Instant::now();
        let mut deadline = started + self.options.max_wait;
        if let Some(hard_deadline) = hard_deadline {
            deadline = deadline.min(hard_deadline);
        }
        info!(
            "Monitoring deployment status for: {} (max wait {:?})",
            handle,
            deadline.saturating_duration_since(started)
        );

        let mut fsm = DeploymentFsm::new();
        let mut poll_backoff = self.options.poll_backoff.start();
        let mut query_backoff = self.options.query_retry.start();
        let mut polls: u32 = 0;

        while Instant::now() < deadline {
            polls += 1;
            debug!("Checking deployment status (attempt {}): {}", polls, handle);

            let status =
                match bounded(self.call_timeout, self.deployments.get_deployment(handle)).await {
                    Ok(status) => {
                        query_backoff = self.options.query_retry.start();
                        status
                    }
                    Err(e) => {
                        let wait = query_backoff.next_delay();
                        if query_backoff.exhausted() {
                            return Err(HandlerError::Transient {
                                operation: "get deployment status".to_string(),
                                attempts: query_backoff.attempt(),
                                message: e.to_string(),
                            });
                        }
                        warn!(
                            "Failed to get deployment status ({} consecutive): {}, retrying in {:?}",
                            query_backoff.attempt(),
                            e,
                            wait
                        );
                        sleep_until_next(wait, deadline).await;
                        continue;
                    }
                };

            info!("Current deployment status: {}", status.state);
            match fsm.observe(status.state) {
                Ok(Observation::Regressed) => {
                    warn!("Deployment {} moved back to {}", handle, status.state)
                }
                Ok(_) => {}
                Err(e) => warn!("{}", e),
            }

            match status.state {
                DeploymentState::Succeeded => {
                    info!("Deployment {} succeeded after {} polls", handle, polls);
                    return Ok(DeploymentState::Succeeded);
                }
                DeploymentState::Failed => {
                    let detail = status
                        .error_message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| NO_ERROR_INFORMATION.to_string());
                    return Err(HandlerError::DeploymentOutcome {
                        handle: handle.clone(),
                        detail: format!("failed: {}", detail),
                    });
                }
                DeploymentState::Stopped => {
                    return Err(HandlerError::DeploymentOutcome {
                        handle: handle.clone(),
                        detail: format!("stopped with status: {}", status.state),
                    });
                }
                DeploymentState::Created | DeploymentState::Queued | DeploymentState::InProgress => {
                    let wait = poll_backoff.next_delay();
                    debug!("Waiting {:?} before next status check", wait);
                    sleep_until_next(wait, deadline).await;
                }
            }
        }

        Err(HandlerError::Timeout {
            handle: handle.clone(),
            waited: started.elapsed(),
        })
    }
}

/// Sleep for `wait`, but never past `deadline`
async fn sleep_until_next(wait: Duration, deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    tokio::time::sleep(wait.min(remaining)).await;
}
