//! HTTP health probe

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::deploy::backoff::BackoffPolicy;
use crate::errors::HandlerError;

/// Issues plain GET requests against health endpoints
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
}

impl HealthProbe {
    /// Create a probe whose every request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, HandlerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HandlerError::Configuration(format!("health check client: {}", e)))?;

        Ok(Self { client })
    }

    /// Single GET; succeeds only on a 2xx status
    pub async fn check(&self, url: &Url) -> Result<u16, String> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| format!("health check failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "health check returned non-success status code: {}",
                status.as_u16()
            ));
        }

        Ok(status.as_u16())
    }

    /// Repeat `check` until it succeeds or the policy runs out of attempts.
    /// Waits between attempts, never after the last one.
    pub async fn check_with_retries(&self, url: &Url, policy: &BackoffPolicy) -> Result<u16, String> {
        let mut backoff = policy.start();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let wait = backoff.next_delay();

            match self.check(url).await {
                Ok(status) => {
                    info!("Health check succeeded on attempt {}: status code {}", attempt, status);
                    return Ok(status);
                }
                Err(e) if backoff.exhausted() => {
                    return Err(format!("failed after {} attempts: {}", attempt, e));
                }
                Err(e) => {
                    warn!("Health check attempt {} failed: {}, retrying in {:?}", attempt, e, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
