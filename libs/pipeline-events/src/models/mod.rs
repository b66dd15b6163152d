//! Event models

use serde::{Deserialize, Serialize};

/// Top-level invocation event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePipelineEvent {
    #[serde(rename = "CodePipeline.job")]
    pub job: PipelineJob,
}

impl CodePipelineEvent {
    /// Job identifier, `None` when absent or empty
    pub fn job_id(&self) -> Option<&str> {
        let id = self.job.id.trim();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// The first input artifact, if the job carries any
    pub fn first_input_artifact(&self) -> Option<&Artifact> {
        self.job.data.input_artifacts.first()
    }
}

/// A single pipeline job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineJob {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(default)]
    pub data: JobData,
}

/// Job payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub input_artifacts: Vec<Artifact>,

    #[serde(default)]
    pub output_artifacts: Vec<Artifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_configuration: Option<ActionConfiguration>,
}

/// Action configuration block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfiguration {
    #[serde(default)]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

/// An input or output artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    #[serde(default)]
    pub location: ArtifactLocation,
}

/// Artifact storage location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    #[serde(rename = "type", default)]
    pub location_type: String,

    #[serde(default)]
    pub s3_location: S3Location,
}

/// Bucket and key of a stored artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    #[serde(default)]
    pub bucket_name: String,

    #[serde(default)]
    pub object_key: String,
}
