//! One handler invocation, from pipeline event to reported outcome

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pipeline_events::CodePipelineEvent;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::app::options::HandlerOptions;
use crate::authn::secret::SecretResolver;
use crate::deploy::driver::DeploymentDriver;
use crate::deploy::monitor::DeploymentMonitor;
use crate::errors::HandlerError;
use crate::models::deployment::{DeploymentHandle, DeploymentRequest, ValidationOutcome};
use crate::models::job::{sanitize_for_log, ArtifactReference, DeploymentJob};
use crate::services::Clients;
use crate::utils::generate_invocation_id;
use crate::validate::health::HealthProbe;
use crate::validate::post::PostDeploymentValidator;
use crate::validate::pre::PreDeploymentValidator;
use crate::workers::reporter::ResultReporter;

/// What a successful invocation did
#[derive(Debug, Clone, Serialize)]
pub struct InvocationSummary {
    pub job_id: String,
    pub deployment: DeploymentHandle,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Gate at which an invocation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    PreDeploymentValidation,
    DeploymentSubmission,
    DeploymentMonitoring,
    PostDeploymentValidation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Configuration => "Configuration check",
            Stage::PreDeploymentValidation => "Pre-deployment validation",
            Stage::DeploymentSubmission => "Deployment submission",
            Stage::DeploymentMonitoring => "Deployment monitoring",
            Stage::PostDeploymentValidation => "Post-deployment validation",
        };
        f.write_str(label)
    }
}

struct StageFailure {
    stage: Stage,
    error: HandlerError,
}

impl StageFailure {
    fn at(stage: Stage) -> impl FnOnce(HandlerError) -> StageFailure {
        move |error| StageFailure { stage, error }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

/// The deployment-trigger handler.
///
/// Built once at process start from options and clients, then invoked once
/// per pipeline job. Holds no per-job state between invocations.
pub struct Handler {
    options: HandlerOptions,
    secrets: SecretResolver,
    pre_validator: PreDeploymentValidator,
    driver: DeploymentDriver,
    monitor: DeploymentMonitor,
    post_validator: PostDeploymentValidator,
    reporter: ResultReporter,
}

// =============================== INITIALIZATION ================================== //

impl Handler {
    pub fn new(options: HandlerOptions, clients: Clients) -> Result<Self, HandlerError> {
        let health = HealthProbe::new(options.health_timeout)?;
        let timeout = options.call_timeout;

        Ok(Self {
            secrets: SecretResolver::new(
                clients.secrets.clone(),
                options.secret_reference.clone(),
                timeout,
            ),
            pre_validator: PreDeploymentValidator::new(
                clients.deployments.clone(),
                clients.artifacts.clone(),
                health.clone(),
                options.pre_validation.clone(),
                timeout,
            ),
            driver: DeploymentDriver::new(
                clients.deployments.clone(),
                options.submission.clone(),
                timeout,
            ),
            monitor: DeploymentMonitor::new(
                clients.deployments.clone(),
                options.monitor.clone(),
                timeout,
            ),
            post_validator: PostDeploymentValidator::new(
                clients.deployments.clone(),
                health,
                options.post_validation.clone(),
                timeout,
            ),
            reporter: ResultReporter::new(
                clients.controller.clone(),
                options.report_timeout(),
            ),
            options,
        })
    }
}

// ================================= INVOCATION ==================================== //

impl Handler {
    /// Handle one pipeline job.
    ///
    /// `budget` is the execution time the host has left for this invocation;
    /// polling stops early enough to still report the outcome.
    ///
    /// Every outcome after the job id is known is reported to the pipeline
    /// exactly once: success through `put_job_success`, any failure through
    /// `put_job_failure`.
    pub async fn handle(
        &self,
        event: &CodePipelineEvent,
        budget: Option<Duration>,
    ) -> Result<InvocationSummary, HandlerError> {
        let started_at = Utc::now();
        let hard_deadline =
            budget.map(|budget| Instant::now() + budget.saturating_sub(self.options.report_reserve));

        match serde_json::to_string(&sanitize_for_log(event)) {
            Ok(json) => info!("Received event: {}", json),
            Err(e) => warn!("Could not serialize event for logging: {}", e),
        }

        let Some(job_id) = event.job_id() else {
            error!("Missing job ID");
            return Err(HandlerError::InvalidEvent(
                "job ID not found in event".to_string(),
            ));
        };

        let span = info_span!(
            "job",
            job_id = %job_id,
            invocation_id = %generate_invocation_id()
        );

        async move {
            match self.execute(job_id, event, hard_deadline).await {
                Ok(deployment) => {
                    self.reporter
                        .report_success(job_id, Some(&deployment))
                        .await?;
                    Ok(InvocationSummary {
                        job_id: job_id.to_string(),
                        deployment,
                        started_at,
                        finished_at: Utc::now(),
                    })
                }
                Err(failure) => {
                    error!("{}", failure);
                    self.reporter
                        .report_failure(job_id, &failure.to_string())
                        .await;
                    Err(failure.error)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job_id: &str,
        event: &CodePipelineEvent,
        hard_deadline: Option<Instant>,
    ) -> Result<DeploymentHandle, StageFailure> {
        let started = Instant::now();
        let target = self
            .options
            .deployment_target()
            .map_err(StageFailure::at(Stage::Configuration))?;

        let artifact = ArtifactReference::from_event(event);
        match &artifact {
            Some(artifact) => info!(
                "Using artifact from S3: bucket={}, key={}",
                artifact.bucket, artifact.key
            ),
            None => warn!("No input artifacts found in the pipeline event"),
        }

        let job = DeploymentJob {
            id: job_id.to_string(),
            application_name: target.application_name,
            deployment_group_name: target.deployment_group_name,
            artifact,
        };

        // The credential lookup is independent of validation and never gates it
        let (credential, validation) =
            tokio::join!(self.secrets.resolve(), self.pre_validator.validate(&job));
        debug!("Source-control credential resolved: {}", credential.is_resolved());
        drop(credential);

        validation
            .into_result()
            .map_err(StageFailure::at(Stage::PreDeploymentValidation))?;

        let request = DeploymentRequest {
            application_name: job.application_name.clone(),
            deployment_group_name: job.deployment_group_name.clone(),
            revision: job.artifact.clone(),
            description: job.description(),
        };

        let deployment = self
            .driver
            .submit(&request)
            .await
            .map_err(StageFailure::at(Stage::DeploymentSubmission))?;

        self.monitor
            .wait_for_completion(&deployment, hard_deadline)
            .await
            .map_err(StageFailure::at(Stage::DeploymentMonitoring))?;

        within(
            hard_deadline,
            &deployment,
            started,
            self.post_validator.validate(&deployment),
        )
        .await
        .and_then(ValidationOutcome::into_result)
        .map_err(StageFailure::at(Stage::PostDeploymentValidation))?;

        Ok(deployment)
    }
}

/// Run `work` for `handle`, giving up at `deadline` when there is one
async fn within<T>(
    deadline: Option<Instant>,
    handle: &DeploymentHandle,
    started: Instant,
    work: impl Future<Output = T>,
) -> Result<T, HandlerError> {
    let Some(deadline) = deadline else {
        return Ok(work.await);
    };

    tokio::time::timeout_at(deadline, work)
        .await
        .map_err(|_| HandlerError::Timeout {
            handle: handle.clone(),
            waited: started.elapsed(),
        })
}
