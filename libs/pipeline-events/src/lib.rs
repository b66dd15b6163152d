//! Pipeline event models
//!
//! Serde models for the job event a pipeline controller sends when it invokes
//! a custom action handler.

pub mod models;

pub use models::{
    ActionConfiguration, Artifact, ArtifactLocation, CodePipelineEvent, JobData, PipelineJob,
    S3Location,
};
