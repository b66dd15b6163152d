//! Deployment submission tests

use std::sync::Arc;
use std::time::Duration;

use deploy_trigger::deploy::backoff::BackoffPolicy;
use deploy_trigger::deploy::driver::DeploymentDriver;
use deploy_trigger::models::deployment::DeploymentRequest;
use deploy_trigger::models::job::{ArchiveFormat, ArtifactReference};
use deploy_trigger::{HandlerError, ServiceError};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use crate::support::{handle, FakeDeployments};

fn request() -> DeploymentRequest {
    DeploymentRequest {
        application_name: "LambdaDeployApp".to_string(),
        deployment_group_name: "LambdaDeploymentGroup".to_string(),
        revision: Some(ArtifactReference {
            bucket: "artifact-bucket".to_string(),
            key: "build/output.zip".to_string(),
            format: ArchiveFormat::Zip,
        }),
        description: "Deployment triggered by CodePipeline job job-1".to_string(),
    }
}

fn driver(deployments: &Arc<FakeDeployments>) -> DeploymentDriver {
    DeploymentDriver::new(
        deployments.clone(),
        BackoffPolicy::submission(),
        Duration::from_secs(5),
    )
}

#[tokio::test(start_paused = true)]
async fn test_submit_first_attempt() {
    let deployments = Arc::new(FakeDeployments::default());
    deployments.script_creates(vec![Ok(handle("d-1"))]);

    let started = Instant::now();
    let result = assert_ok!(driver(&deployments).submit(&request()).await);

    assert_eq!(result, handle("d-1"));
    assert_eq!(deployments.count("create_deployment"), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);

    let sent = deployments.requests.lock().unwrap()[0].clone();
    assert_eq!(sent, request());
}

#[tokio::test(start_paused = true)]
async fn test_submit_retries_with_backoff() {
    let deployments = Arc::new(FakeDeployments::default());
    deployments.script_creates(vec![
        Err(ServiceError::Transient("throttled".to_string())),
        Err(ServiceError::Transient("throttled".to_string())),
        Ok(handle("d-3")),
    ]);

    let started = Instant::now();
    let result = assert_ok!(driver(&deployments).submit(&request()).await);

    assert_eq!(result, handle("d-3"));
    assert_eq!(deployments.count("create_deployment"), 3);
    // 2s after the first failure, 4s after the second
    assert_eq!(started.elapsed(), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_submit_gives_up_after_three_attempts() {
    let deployments = Arc::new(FakeDeployments::default());
    deployments.script_creates(vec![
        Err(ServiceError::Transient("throttled".to_string())),
        Err(ServiceError::Transient("throttled".to_string())),
        Err(ServiceError::AccessDenied("codedeploy:CreateDeployment".to_string())),
    ]);

    let started = Instant::now();
    let err = assert_err!(driver(&deployments).submit(&request()).await);

    match &err {
        HandlerError::Transient {
            operation,
            attempts,
            message,
        } => {
            assert_eq!(operation, "create deployment");
            assert_eq!(*attempts, 3);
            assert!(message.contains("codedeploy:CreateDeployment"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().starts_with("Failed to create deployment after 3 attempts"));
    assert_eq!(deployments.count("create_deployment"), 3);
    // No wait after the final attempt
    assert_eq!(started.elapsed(), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_submit_without_revision() {
    let deployments = Arc::new(FakeDeployments::default());
    let mut request = request();
    request.revision = None;

    let result = assert_ok!(driver(&deployments).submit(&request).await);

    assert_eq!(result, handle("d-DEFAULT"));
    assert!(deployments.requests.lock().unwrap()[0].revision.is_none());
}
