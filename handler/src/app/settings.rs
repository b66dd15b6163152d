//! Environment-sourced settings

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::HandlerError;

/// Raw handler settings, one field per environment variable.
///
/// Everything is optional here; required values are checked per invocation
/// so a misconfigured handler can still report the failure to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// `APPLICATION_NAME`
    #[serde(default)]
    pub application_name: Option<String>,

    /// `DEPLOYMENT_GROUP_NAME`
    #[serde(default)]
    pub deployment_group_name: Option<String>,

    /// `GITHUB_TOKEN`: reference (ARN or name) of the source-control secret
    #[serde(default)]
    pub github_token: Option<String>,

    /// `MAX_DEPLOYMENT_WAIT_TIME`: seconds, positive integer
    #[serde(default)]
    pub max_deployment_wait_time: Option<String>,

    /// `HEALTH_CHECK_URL`: infrastructure health endpoint
    #[serde(default)]
    pub health_check_url: Option<String>,

    /// `APP_HEALTH_CHECK_URL`: application health endpoint
    #[serde(default)]
    pub app_health_check_url: Option<String>,

    /// `CALL_TIMEOUT_SECS`: per-call timeout for external services
    #[serde(default)]
    pub call_timeout_secs: Option<String>,

    /// `REPORT_RESERVE_SECS`: time kept back from polling for the final report
    #[serde(default)]
    pub report_reserve_secs: Option<String>,

    /// `LOG_LEVEL`
    #[serde(default)]
    pub log_level: Option<String>,

    /// `LOG_FORMAT`: `json` or `text`
    #[serde(default)]
    pub log_format: Option<String>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, HandlerError> {
        Self::load(None)
    }

    /// Load settings from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, HandlerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, HandlerError> {
        let source = vars.map(|vars| vars.into_iter().collect::<config::Map<String, String>>());

        let settings: Settings = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .ignore_empty(true)
                    .source(source),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| HandlerError::Configuration(e.to_string()))?;

        Ok(settings.normalized())
    }

    /// Treat blank values as unset
    fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            application_name: clean(self.application_name),
            deployment_group_name: clean(self.deployment_group_name),
            github_token: clean(self.github_token),
            max_deployment_wait_time: clean(self.max_deployment_wait_time),
            health_check_url: clean(self.health_check_url),
            app_health_check_url: clean(self.app_health_check_url),
            call_timeout_secs: clean(self.call_timeout_secs),
            report_reserve_secs: clean(self.report_reserve_secs),
            log_level: clean(self.log_level),
            log_format: clean(self.log_format),
        }
    }
}
