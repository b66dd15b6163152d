//! Deployment job models

use pipeline_events::CodePipelineEvent;
use serde::{Deserialize, Serialize};

/// Revisions longer than this are truncated before logging
pub const MAX_LOGGED_REVISION_LEN: usize = 10;

/// Archive format of a deployable bundle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Zip,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Location of the artifact to deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub bucket: String,
    pub key: String,
    pub format: ArchiveFormat,
}

impl ArtifactReference {
    /// Build a reference from the first input artifact of an event.
    /// Returns `None` unless both bucket and key are present.
    pub fn from_event(event: &CodePipelineEvent) -> Option<Self> {
        let location = &event.first_input_artifact()?.location.s3_location;
        if location.bucket_name.is_empty() || location.object_key.is_empty() {
            return None;
        }

        Some(Self {
            bucket: location.bucket_name.clone(),
            key: location.object_key.clone(),
            format: ArchiveFormat::default(),
        })
    }
}

/// One pipeline execution's deployment request.
///
/// Built once per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentJob {
    pub id: String,
    pub application_name: String,
    pub deployment_group_name: String,
    pub artifact: Option<ArtifactReference>,
}

impl DeploymentJob {
    pub fn description(&self) -> String {
        format!("Deployment triggered by CodePipeline job {}", self.id)
    }
}

/// Copy of `event` that is safe to log.
///
/// Long artifact revisions are cut down to their first few characters; the
/// event used for processing is left untouched.
pub fn sanitize_for_log(event: &CodePipelineEvent) -> CodePipelineEvent {
    let mut sanitized = event.clone();
    let data = &mut sanitized.job.data;

    for artifact in data
        .input_artifacts
        .iter_mut()
        .chain(data.output_artifacts.iter_mut())
    {
        if let Some(revision) = artifact.revision.as_mut() {
            if revision.chars().count() > MAX_LOGGED_REVISION_LEN {
                let head: String = revision.chars().take(MAX_LOGGED_REVISION_LEN).collect();
                *revision = format!("{head}...");
            }
        }
    }

    sanitized
}
