//! Pre- and post-deployment validation tests

use std::sync::Arc;
use std::time::Duration;

use deploy_trigger::deploy::backoff::BackoffPolicy;
use deploy_trigger::models::deployment::TargetStatus;
use deploy_trigger::models::job::{ArchiveFormat, ArtifactReference, DeploymentJob};
use deploy_trigger::validate::health::HealthProbe;
use deploy_trigger::validate::post::{self, PostDeploymentValidator};
use deploy_trigger::validate::pre::{self, PreDeploymentValidator};
use deploy_trigger::ServiceError;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{handle, FakeArtifacts, FakeDeployments};

fn job(artifact: Option<ArtifactReference>) -> DeploymentJob {
    DeploymentJob {
        id: "job-1".to_string(),
        application_name: "LambdaDeployApp".to_string(),
        deployment_group_name: "LambdaDeploymentGroup".to_string(),
        artifact,
    }
}

fn artifact() -> ArtifactReference {
    ArtifactReference {
        bucket: "artifact-bucket".to_string(),
        key: "build/output.zip".to_string(),
        format: ArchiveFormat::Zip,
    }
}

fn probe() -> HealthProbe {
    HealthProbe::new(Duration::from_secs(5)).unwrap()
}

fn health_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/health", server.uri())).unwrap()
}

fn pre_validator(
    deployments: &Arc<FakeDeployments>,
    artifacts: &Arc<FakeArtifacts>,
    health_check_url: Option<Url>,
) -> PreDeploymentValidator {
    PreDeploymentValidator::new(
        deployments.clone(),
        artifacts.clone(),
        probe(),
        pre::Options { health_check_url },
        Duration::from_secs(5),
    )
}

fn post_validator(
    deployments: &Arc<FakeDeployments>,
    app_health_check_url: Option<Url>,
) -> PostDeploymentValidator {
    PostDeploymentValidator::new(
        deployments.clone(),
        probe(),
        post::Options {
            app_health_check_url,
            health_retry: BackoffPolicy::fixed(Duration::from_millis(10), 3),
        },
        Duration::from_secs(5),
    )
}

fn target(id: &str, status: Option<&str>) -> TargetStatus {
    TargetStatus {
        target_id: id.to_string(),
        status: status.map(str::to_string),
    }
}

// ================================== PRE ===================================== //

#[tokio::test]
async fn test_pre_validation_passes() {
    let deployments = Arc::new(FakeDeployments::default());
    let artifacts = Arc::new(FakeArtifacts::default());

    let outcome = pre_validator(&deployments, &artifacts, None)
        .validate(&job(Some(artifact())))
        .await;

    assert!(outcome.passed, "{}", outcome.reason);
    assert_eq!(
        deployments.calls(),
        vec![
            "get_deployment_group LambdaDeployApp/LambdaDeploymentGroup".to_string(),
            "list_deployments".to_string(),
        ]
    );
    assert_eq!(
        artifacts.probes.lock().unwrap().clone(),
        vec![("artifact-bucket".to_string(), "build/output.zip".to_string())]
    );
}

#[tokio::test]
async fn test_pre_validation_missing_group() {
    let deployments = Arc::new(FakeDeployments::default());
    *deployments.group.lock().unwrap() = Err(ServiceError::NotFound(
        "LambdaDeploymentGroup".to_string(),
    ));
    let artifacts = Arc::new(FakeArtifacts::default());

    let outcome = pre_validator(&deployments, &artifacts, None)
        .validate(&job(Some(artifact())))
        .await;

    assert!(!outcome.passed);
    assert!(outcome.reason.starts_with("deployment group validation failed"));
    assert!(artifacts.probes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_pre_validation_missing_artifact() {
    let deployments = Arc::new(FakeDeployments::default());
    let artifacts = Arc::new(FakeArtifacts::default());
    *artifacts.exists.lock().unwrap() = Ok(false);

    let outcome = pre_validator(&deployments, &artifacts, None)
        .validate(&job(Some(artifact())))
        .await;

    assert!(!outcome.passed);
    assert_eq!(
        outcome.reason,
        "artifact validation failed: not found: s3://artifact-bucket/build/output.zip"
    );
    assert_eq!(deployments.count("list_deployments"), 0);
}

#[tokio::test]
async fn test_pre_validation_artifact_lookup_error() {
    let deployments = Arc::new(FakeDeployments::default());
    let artifacts = Arc::new(FakeArtifacts::default());
    *artifacts.exists.lock().unwrap() = Err(ServiceError::AccessDenied("s3:HeadObject".to_string()));

    let outcome = pre_validator(&deployments, &artifacts, None)
        .validate(&job(Some(artifact())))
        .await;

    assert!(!outcome.passed);
    assert!(outcome.reason.contains("s3:HeadObject"), "{}", outcome.reason);
}

#[tokio::test]
async fn test_pre_validation_skips_artifact_check_without_artifact() {
    let deployments = Arc::new(FakeDeployments::default());
    let artifacts = Arc::new(FakeArtifacts::default());

    let outcome = pre_validator(&deployments, &artifacts, None)
        .validate(&job(None))
        .await;

    assert!(outcome.passed);
    assert!(artifacts.probes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_pre_validation_in_flight_deployments_are_advisory() {
    let deployments = Arc::new(FakeDeployments::default());
    *deployments.in_flight.lock().unwrap() = Ok(vec![handle("d-OLD")]);
    let artifacts = Arc::new(FakeArtifacts::default());

    let outcome = pre_validator(&deployments, &artifacts, None)
        .validate(&job(Some(artifact())))
        .await;
    assert!(outcome.passed);

    *deployments.in_flight.lock().unwrap() =
        Err(ServiceError::Transient("throttled".to_string()));
    let outcome = pre_validator(&deployments, &artifacts, None)
        .validate(&job(Some(artifact())))
        .await;
    assert!(outcome.passed);
}

#[tokio::test]
async fn test_pre_validation_infrastructure_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let deployments = Arc::new(FakeDeployments::default());
    let artifacts = Arc::new(FakeArtifacts::default());

    let outcome = pre_validator(&deployments, &artifacts, Some(health_url(&server)))
        .validate(&job(Some(artifact())))
        .await;

    assert!(!outcome.passed);
    assert_eq!(
        outcome.reason,
        "infrastructure validation failed: health check returned non-success status code: 503"
    );
}

#[tokio::test]
async fn test_pre_validation_infrastructure_healthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let deployments = Arc::new(FakeDeployments::default());
    let artifacts = Arc::new(FakeArtifacts::default());

    let outcome = pre_validator(&deployments, &artifacts, Some(health_url(&server)))
        .validate(&job(None))
        .await;

    assert!(outcome.passed, "{}", outcome.reason);
}

// ================================== POST ==================================== //

#[tokio::test]
async fn test_post_validation_all_targets_succeeded() {
    let deployments = Arc::new(FakeDeployments::default());
    *deployments.targets.lock().unwrap() = vec![
        target("i-0a1b", Some("Succeeded")),
        target("my-function:live", None),
    ];

    let outcome = post_validator(&deployments, None).validate(&handle("d-1")).await;

    assert!(outcome.passed, "{}", outcome.reason);
    assert_eq!(deployments.count("get_deployment_target"), 2);
}

#[tokio::test]
async fn test_post_validation_failed_target() {
    let deployments = Arc::new(FakeDeployments::default());
    *deployments.targets.lock().unwrap() = vec![
        target("i-0a1b", Some("Succeeded")),
        target("i-0c2d", Some("Failed")),
        target("i-0e3f", Some("Succeeded")),
    ];

    let outcome = post_validator(&deployments, None).validate(&handle("d-1")).await;

    assert!(!outcome.passed);
    assert_eq!(
        outcome.reason,
        "deployment failed on target i-0c2d with status: Failed"
    );
    // Stops at the first failing target
    assert_eq!(deployments.count("get_deployment_target"), 2);
}

#[tokio::test]
async fn test_post_validation_unreadable_deployment() {
    let deployments = Arc::new(FakeDeployments::default());
    deployments.script_statuses(vec![Err(ServiceError::NotFound("d-1".to_string()))]);

    let outcome = post_validator(&deployments, None).validate(&handle("d-1")).await;

    assert!(!outcome.passed);
    assert_eq!(outcome.reason, "failed to get deployment info: not found: d-1");
    assert_eq!(deployments.count("list_deployment_targets"), 0);
}

#[tokio::test]
async fn test_post_validation_app_health_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let deployments = Arc::new(FakeDeployments::default());

    let outcome = post_validator(&deployments, Some(health_url(&server)))
        .validate(&handle("d-1"))
        .await;

    assert!(outcome.passed, "{}", outcome.reason);
}

#[tokio::test]
async fn test_post_validation_app_health_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let deployments = Arc::new(FakeDeployments::default());

    let outcome = post_validator(&deployments, Some(health_url(&server)))
        .validate(&handle("d-1"))
        .await;

    assert!(!outcome.passed);
    assert!(
        outcome
            .reason
            .starts_with("application health validation failed: failed after 3 attempts"),
        "{}",
        outcome.reason
    );
}
