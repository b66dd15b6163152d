//! AWS-backed collaborators
//!
//! One shared SDK config is loaded at process start; every client built from
//! it carries the same per-operation timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_codedeploy::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_codedeploy::types::{
    BundleType, DeploymentStatus as SdkDeploymentStatus, RevisionLocation, RevisionLocationType,
    S3Location,
};
use aws_sdk_codepipeline::types::{ExecutionDetails, FailureDetails, FailureType};
use secrecy::SecretString;
use tracing::debug;

use crate::deploy::fsm::DeploymentState;
use crate::errors::ServiceError;
use crate::models::deployment::{
    DeploymentHandle, DeploymentRequest, DeploymentStatus, TargetStatus,
};
use crate::services::{ArtifactStore, Clients, DeploymentService, PipelineController, SecretStore};

/// Longest summary the pipeline console accepts
const MAX_SUMMARY_LEN: usize = 2048;

/// Longest failure message the pipeline console accepts
const MAX_FAILURE_MESSAGE_LEN: usize = 5000;

/// Load the shared SDK configuration
pub async fn load_sdk_config(operation_timeout: Duration) -> SdkConfig {
    let timeouts = TimeoutConfig::builder()
        .operation_timeout(operation_timeout)
        .build();

    aws_config::defaults(BehaviorVersion::latest())
        .timeout_config(timeouts)
        .load()
        .await
}

/// Build every client from one SDK config
pub fn clients(config: &SdkConfig) -> Clients {
    Clients {
        deployments: Arc::new(CodeDeployService::new(aws_sdk_codedeploy::Client::new(config))),
        artifacts: Arc::new(S3ArtifactStore::new(aws_sdk_s3::Client::new(config))),
        secrets: Arc::new(SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(
            config,
        ))),
        controller: Arc::new(CodePipelineController::new(aws_sdk_codepipeline::Client::new(
            config,
        ))),
    }
}

fn service_error<E, R>(operation: &str, err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    let message = format!("{}: {}", operation, DisplayErrorContext(&err));

    match code.as_deref() {
        Some(code)
            if code.contains("NotFound")
                || code.contains("DoesNotExist")
                || code == "NoSuchKey"
                || code == "NoSuchBucket" =>
        {
            ServiceError::NotFound(message)
        }
        Some(code) if code.contains("AccessDenied") || code.contains("Unauthorized") => {
            ServiceError::AccessDenied(message)
        }
        _ => ServiceError::Transient(message),
    }
}

fn truncate(message: &str, max_len: usize) -> String {
    if message.len() <= max_len {
        return message.to_string();
    }
    let mut end = max_len;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}

// ============================== CODEDEPLOY ================================== //

/// CodeDeploy-backed deployment service
pub struct CodeDeployService {
    client: aws_sdk_codedeploy::Client,
}

impl CodeDeployService {
    pub fn new(client: aws_sdk_codedeploy::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeploymentService for CodeDeployService {
    async fn get_deployment_group(
        &self,
        application_name: &str,
        deployment_group_name: &str,
    ) -> Result<(), ServiceError> {
        self.client
            .get_deployment_group()
            .application_name(application_name)
            .deployment_group_name(deployment_group_name)
            .send()
            .await
            .map_err(|e| service_error("get deployment group", e))?;
        Ok(())
    }

    async fn list_deployments(
        &self,
        application_name: &str,
        deployment_group_name: &str,
        statuses: &[DeploymentState],
    ) -> Result<Vec<DeploymentHandle>, ServiceError> {
        let mut request = self
            .client
            .list_deployments()
            .application_name(application_name)
            .deployment_group_name(deployment_group_name);
        for state in statuses {
            request = request.include_only_statuses(SdkDeploymentStatus::from(state.as_str()));
        }

        // The first page is enough for an advisory check
        let output = request
            .send()
            .await
            .map_err(|e| service_error("list deployments", e))?;

        Ok(output
            .deployments()
            .iter()
            .map(DeploymentHandle::new)
            .collect())
    }

    async fn create_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeploymentHandle, ServiceError> {
        let mut builder = self
            .client
            .create_deployment()
            .application_name(&request.application_name)
            .deployment_group_name(&request.deployment_group_name)
            .description(&request.description);

        if let Some(artifact) = &request.revision {
            let location = S3Location::builder()
                .bucket(&artifact.bucket)
                .key(&artifact.key)
                .bundle_type(BundleType::from(artifact.format.as_str()))
                .build();
            builder = builder.revision(
                RevisionLocation::builder()
                    .revision_type(RevisionLocationType::S3)
                    .s3_location(location)
                    .build(),
            );
        }

        let output = builder
            .send()
            .await
            .map_err(|e| service_error("create deployment", e))?;

        output
            .deployment_id()
            .map(DeploymentHandle::new)
            .ok_or_else(|| {
                ServiceError::Transient("create deployment returned no deployment id".to_string())
            })
    }

    async fn get_deployment(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<DeploymentStatus, ServiceError> {
        let output = self
            .client
            .get_deployment()
            .deployment_id(handle.as_str())
            .send()
            .await
            .map_err(|e| service_error("get deployment", e))?;

        let info = output.deployment_info().ok_or_else(|| {
            ServiceError::Transient(format!("deployment {} returned no deployment info", handle))
        })?;

        let raw_status = info.status().map(|s| s.as_str()).unwrap_or_default();
        let state = DeploymentState::from_service_status(raw_status);
        debug!("Deployment {} raw status {:?} -> {}", handle, raw_status, state);

        Ok(DeploymentStatus {
            state,
            error_message: info
                .error_information()
                .and_then(|e| e.message())
                .map(str::to_string),
        })
    }

    async fn list_deployment_targets(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<Vec<String>, ServiceError> {
        let mut targets = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_deployment_targets()
                .deployment_id(handle.as_str())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| service_error("list deployment targets", e))?;

            targets.extend(output.target_ids().iter().cloned());

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(targets)
    }

    async fn get_deployment_target(
        &self,
        handle: &DeploymentHandle,
        target_id: &str,
    ) -> Result<TargetStatus, ServiceError> {
        let output = self
            .client
            .get_deployment_target()
            .deployment_id(handle.as_str())
            .target_id(target_id)
            .send()
            .await
            .map_err(|e| service_error(&format!("get deployment target {}", target_id), e))?;

        let status = output.deployment_target().and_then(|target| {
            target
                .instance_target()
                .and_then(|t| t.status())
                .or_else(|| target.lambda_target().and_then(|t| t.status()))
                .or_else(|| target.ecs_target().and_then(|t| t.status()))
                .or_else(|| target.cloud_formation_target().and_then(|t| t.status()))
                .map(|s| s.as_str().to_string())
        });

        Ok(TargetStatus {
            target_id: target_id.to_string(),
            status,
        })
    }
}

// ================================= S3 ======================================= //

/// S3-backed artifact store
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
}

impl S3ArtifactStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ServiceError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(service_error("head object", err)),
        }
    }
}

// ============================ SECRETS MANAGER =============================== //

/// Secrets Manager-backed secret store
pub struct SecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerStore {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret(&self, reference: &str) -> Result<SecretString, ServiceError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(reference)
            .send()
            .await
            .map_err(|e| service_error("get secret value", e))?;

        output
            .secret_string()
            .map(|value| SecretString::from(value.to_string()))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("secret {} has no string value", reference))
            })
    }
}

// ============================== CODEPIPELINE ================================ //

/// CodePipeline-backed controller
pub struct CodePipelineController {
    client: aws_sdk_codepipeline::Client,
}

impl CodePipelineController {
    pub fn new(client: aws_sdk_codepipeline::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelineController for CodePipelineController {
    async fn put_job_success(
        &self,
        job_id: &str,
        summary: &str,
        external_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        let details = ExecutionDetails::builder()
            .summary(truncate(summary, MAX_SUMMARY_LEN))
            .set_external_execution_id(external_id.map(str::to_string))
            .build();

        self.client
            .put_job_success_result()
            .job_id(job_id)
            .execution_details(details)
            .send()
            .await
            .map_err(|e| service_error("put job success result", e))?;
        Ok(())
    }

    async fn put_job_failure(&self, job_id: &str, message: &str) -> Result<(), ServiceError> {
        let details = FailureDetails::builder()
            .r#type(FailureType::JobFailed)
            .message(truncate(message, MAX_FAILURE_MESSAGE_LEN))
            .build()
            .map_err(|e| ServiceError::Transient(format!("failure details: {}", e)))?;

        self.client
            .put_job_failure_result()
            .job_id(job_id)
            .failure_details(details)
            .send()
            .await
            .map_err(|e| service_error("put job failure result", e))?;
        Ok(())
    }
}
