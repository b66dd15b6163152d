//! Reports the job outcome back to the pipeline controller

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::errors::HandlerError;
use crate::models::deployment::DeploymentHandle;
use crate::services::{bounded, PipelineController};

/// Sends exactly one outcome notification per call
pub struct ResultReporter {
    controller: Arc<dyn PipelineController>,
    call_timeout: Duration,
}

impl ResultReporter {
    pub fn new(controller: Arc<dyn PipelineController>, call_timeout: Duration) -> Self {
        Self {
            controller,
            call_timeout,
        }
    }

    /// Notify success. The pipeline cannot progress without this call, so
    /// its failure is surfaced.
    pub async fn report_success(
        &self,
        job_id: &str,
        deployment: Option<&DeploymentHandle>,
    ) -> Result<(), HandlerError> {
        info!("Reporting success for job: {}", job_id);

        let summary = match deployment {
            Some(handle) => format!("Deployment {} succeeded", handle),
            None => "Deployment succeeded".to_string(),
        };

        bounded(
            self.call_timeout,
            self.controller.put_job_success(
                job_id,
                &summary,
                deployment.map(DeploymentHandle::as_str),
            ),
        )
        .await
        .map_err(|e| {
            error!("Failed to report success to the pipeline: {}", e);
            HandlerError::Reporting(format!("failed to report success to the pipeline: {}", e))
        })?;

        info!("Successfully reported job completion to the pipeline");
        Ok(())
    }

    /// Notify failure. Best effort: the outcome is already decided, so a
    /// failed notification is only logged.
    pub async fn report_failure(&self, job_id: &str, message: &str) {
        info!("Reporting failure for job {}: {}", job_id, message);

        match bounded(
            self.call_timeout,
            self.controller.put_job_failure(job_id, message),
        )
        .await
        {
            Ok(()) => info!("Successfully reported job failure to the pipeline"),
            Err(e) => error!("Failed to report failure to the pipeline: {}", e),
        }
    }
}
