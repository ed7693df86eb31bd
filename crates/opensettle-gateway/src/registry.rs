//! Best-effort registry sync.
//!
//! After a release, the gateway tells the external job registry that the
//! work settled — display and statistics only. A failed notification never
//! fails the claim: the payment invariant lives on the ledger, not here.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use opensettle_types::{JobCompleted, OpensettleError, Result};

/// Sink for "job completed" facts.
#[async_trait]
pub trait RegistryNotifier: Send + Sync {
    async fn job_completed(&self, fact: &JobCompleted) -> Result<()>;
}

/// Posts completion facts to the registry's HTTP endpoint.
pub struct HttpRegistryNotifier {
    url: String,
    client: Client,
}

impl HttpRegistryNotifier {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RegistryNotifier for HttpRegistryNotifier {
    async fn job_completed(&self, fact: &JobCompleted) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(fact)
            .send()
            .await
            .map_err(|e| OpensettleError::Transport {
                reason: format!("registry: {e}"),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(OpensettleError::Transport {
                reason: format!("registry answered HTTP {status}"),
            });
        }
        debug!(worker = %fact.worker_id, "registry notified of completion");
        Ok(())
    }
}

/// Discards completion facts. Used when no registry is configured.
#[derive(Default)]
pub struct NullNotifier;

#[async_trait]
impl RegistryNotifier for NullNotifier {
    async fn job_completed(&self, _fact: &JobCompleted) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensettle_types::{AccountId, Amount};

    #[tokio::test]
    async fn null_notifier_accepts_everything() {
        let notifier = NullNotifier;
        let fact = JobCompleted {
            worker_id: AccountId::from_pubkey([1; 32]),
            payer_id: AccountId::from_pubkey([2; 32]),
            amount: Amount::new(8),
        };
        notifier.job_completed(&fact).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_registry_is_a_transport_error() {
        let notifier = HttpRegistryNotifier::new("http://127.0.0.1:9/jobs/completed");
        let fact = JobCompleted {
            worker_id: AccountId::from_pubkey([1; 32]),
            payer_id: AccountId::from_pubkey([2; 32]),
            amount: Amount::new(8),
        };
        let err = notifier.job_completed(&fact).await.unwrap_err();
        assert!(matches!(err, OpensettleError::Transport { .. }));
    }
}
