//! Configuration types for the gateway, dispatcher, and claim client.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::{Amount, constants};

/// Configuration for a Payment Gateway instance.
///
/// Gateways are stateless — any number of instances with the same
/// configuration can serve the same escrows concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address to listen on for the HTTP claim surface.
    pub listen_addr: SocketAddr,
    /// External job registry endpoint for best-effort completion facts.
    /// `None` disables registry sync.
    pub registry_url: Option<String>,
    /// Dispatch timing and incentive configuration.
    pub dispatch: DispatchConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                constants::DEFAULT_API_PORT,
            ),
            registry_url: None,
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Settlement instruction validity window in milliseconds. The race is
    /// abandoned (and the dispatch fails) once this elapses.
    pub expiry_ms: u64,
    /// Incentive pre-paid to the priority path, in minor units.
    pub priority_incentive: Amount,
}

impl DispatchConfig {
    /// The expiry window as a [`Duration`].
    #[must_use]
    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            expiry_ms: constants::DEFAULT_DISPATCH_EXPIRY_MS,
            priority_incentive: Amount::new(constants::DEFAULT_PRIORITY_INCENTIVE),
        }
    }
}

/// Claim client retry policy: bounded linear backoff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum consecutive `PaymentRequired` responses before giving up.
    pub max_attempts: u32,
    /// Linear backoff base in milliseconds; attempt `n` sleeps `base * n`.
    pub backoff_base_ms: u64,
}

impl RetryConfig {
    /// Sleep duration before the retry following attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(u64::from(attempt)))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_CLAIM_ATTEMPTS,
            backoff_base_ms: constants::DEFAULT_BACKOFF_BASE_MS,
        }
    }
}
