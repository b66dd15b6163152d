//! Handler configuration options

use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::app::settings::Settings;
use crate::deploy::backoff::BackoffPolicy;
use crate::deploy::monitor;
use crate::errors::HandlerError;
use crate::logs::{LogLevel, LogOptions};
use crate::validate::{post, pre};

/// Main handler options
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    /// Application to deploy; required per invocation
    pub application_name: Option<String>,

    /// Deployment group to deploy to; required per invocation
    pub deployment_group_name: Option<String>,

    /// Secret reference for the source-control credential
    pub secret_reference: Option<String>,

    /// Timeout applied to every external service call
    pub call_timeout: Duration,

    /// Timeout applied to every health check request
    pub health_timeout: Duration,

    /// Time kept back from polling so the final report can still be sent
    pub report_reserve: Duration,

    /// Deployment submission retries
    pub submission: BackoffPolicy,

    /// Deployment monitor options
    pub monitor: monitor::Options,

    /// Pre-deployment validation options
    pub pre_validation: pre::Options,

    /// Post-deployment validation options
    pub post_validation: post::Options,

    /// Logging options
    pub logging: LogOptions,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            application_name: None,
            deployment_group_name: None,
            secret_reference: None,
            call_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(10),
            report_reserve: Duration::from_secs(15),
            submission: BackoffPolicy::submission(),
            monitor: monitor::Options::default(),
            pre_validation: pre::Options::default(),
            post_validation: post::Options::default(),
            logging: LogOptions::default(),
        }
    }
}

/// Required deployment coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub application_name: String,
    pub deployment_group_name: String,
}

impl HandlerOptions {
    /// Build options from raw settings. Invalid optional values fall back to
    /// their defaults with a warning.
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();

        let max_wait = parse_positive_secs(
            "MAX_DEPLOYMENT_WAIT_TIME",
            settings.max_deployment_wait_time.as_deref(),
            defaults.monitor.max_wait,
        );
        let call_timeout = parse_positive_secs(
            "CALL_TIMEOUT_SECS",
            settings.call_timeout_secs.as_deref(),
            defaults.call_timeout,
        );
        let report_reserve = parse_positive_secs(
            "REPORT_RESERVE_SECS",
            settings.report_reserve_secs.as_deref(),
            defaults.report_reserve,
        );

        let log_level = match settings.log_level.as_deref().map(str::parse::<LogLevel>) {
            Some(Ok(level)) => level,
            Some(Err(e)) => {
                warn!("{}, using default", e);
                LogLevel::default()
            }
            None => LogLevel::default(),
        };
        let json_format = !matches!(settings.log_format.as_deref(), Some(f) if f.eq_ignore_ascii_case("text"));

        Self {
            application_name: settings.application_name.clone(),
            deployment_group_name: settings.deployment_group_name.clone(),
            secret_reference: settings.github_token.clone(),
            call_timeout,
            report_reserve,
            monitor: monitor::Options {
                max_wait,
                ..defaults.monitor
            },
            pre_validation: pre::Options {
                health_check_url: parse_url("HEALTH_CHECK_URL", settings.health_check_url.as_deref()),
            },
            post_validation: post::Options {
                app_health_check_url: parse_url(
                    "APP_HEALTH_CHECK_URL",
                    settings.app_health_check_url.as_deref(),
                ),
                ..defaults.post_validation
            },
            logging: LogOptions {
                log_level,
                json_format,
                ..defaults.logging
            },
            ..defaults
        }
    }

    /// Timeout for the final controller notification, capped at the reserve
    pub fn report_timeout(&self) -> Duration {
        self.call_timeout.min(self.report_reserve)
    }

    /// The application and group to deploy, or a configuration error naming
    /// every missing variable
    pub fn deployment_target(&self) -> Result<DeploymentTarget, HandlerError> {
        match (&self.application_name, &self.deployment_group_name) {
            (Some(application_name), Some(deployment_group_name)) => Ok(DeploymentTarget {
                application_name: application_name.clone(),
                deployment_group_name: deployment_group_name.clone(),
            }),
            (application_name, deployment_group_name) => {
                let mut missing = Vec::new();
                if application_name.is_none() {
                    missing.push("APPLICATION_NAME");
                }
                if deployment_group_name.is_none() {
                    missing.push("DEPLOYMENT_GROUP_NAME");
                }
                Err(HandlerError::Configuration(format!(
                    "missing required environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

fn parse_positive_secs(name: &str, value: Option<&str>, default: Duration) -> Duration {
    match value {
        None => default,
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!("Invalid {} value {}, using default {:?}", name, raw, default);
                default
            }
        },
    }
}

fn parse_url(name: &str, value: Option<&str>) -> Option<Url> {
    let raw = value?;
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            warn!("Unsupported {} scheme {}, skipping check", name, url.scheme());
            None
        }
        Err(e) => {
            warn!("Invalid {} value {}: {}, skipping check", name, raw, e);
            None
        }
    }
}
