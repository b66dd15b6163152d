//! Source-control credential lookup
//!
//! The credential is resolved on every invocation but nothing downstream
//! consumes it yet, so a lookup failure is only ever a warning.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::errors::ServiceError;
use crate::services::{bounded, SecretStore};

/// Result of resolving the configured secret
#[derive(Debug)]
pub enum SecretResolution {
    /// No secret reference configured
    Skipped,

    /// Secret value fetched
    Resolved(SecretString),

    /// Lookup failed; the deployment carries on without it
    Unavailable(ServiceError),
}

impl SecretResolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, SecretResolution::Resolved(_))
    }
}

/// Resolves a secret reference against the secret store
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
    reference: Option<String>,
    call_timeout: Duration,
}

impl SecretResolver {
    pub fn new(
        store: Arc<dyn SecretStore>,
        reference: Option<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            reference,
            call_timeout,
        }
    }

    /// Fetch the secret. Never fails the caller.
    pub async fn resolve(&self) -> SecretResolution {
        let Some(reference) = self.reference.as_deref() else {
            debug!("No secret reference configured, skipping secret lookup");
            return SecretResolution::Skipped;
        };

        match bounded(self.call_timeout, self.store.get_secret(reference)).await {
            Ok(secret) if secret.expose_secret().is_empty() => {
                warn!("Secret {} resolved to an empty value", reference);
                SecretResolution::Unavailable(ServiceError::NotFound(format!(
                    "secret {} is empty",
                    reference
                )))
            }
            Ok(secret) => {
                info!("Resolved source-control credential from {}", reference);
                SecretResolution::Resolved(secret)
            }
            Err(e) => {
                match &e {
                    ServiceError::NotFound(_) => warn!("Secret {} not found: {}", reference, e),
                    ServiceError::AccessDenied(_) => {
                        warn!("Access denied reading secret {}: {}", reference, e)
                    }
                    ServiceError::Transient(_) | ServiceError::Timeout(_) => {
                        warn!("Failed to get secret {}: {}", reference, e)
                    }
                }
                SecretResolution::Unavailable(e)
            }
        }
    }
}
