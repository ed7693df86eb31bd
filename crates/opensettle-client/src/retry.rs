//! Bounded claim retry with linear backoff.

use async_trait::async_trait;
use tracing::{debug, info};

use opensettle_types::{
    AccountId, ClaimRequest, ClaimResponse, EscrowId, Released, Result, RetryConfig,
};

/// Anything that can answer a claim — the HTTP client in production, an
/// in-process gateway in tests.
#[async_trait]
pub trait ClaimEndpoint: Send + Sync {
    async fn claim(&self, request: &ClaimRequest) -> Result<ClaimResponse>;
}

/// Terminal outcome of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The gateway released the payment.
    Released(Released),
    /// `max_attempts` consecutive `PaymentRequired` answers. The escrow is
    /// still live — a later re-attempt (manual or scheduled) may succeed.
    GaveUp { attempts: u32 },
}

/// Claim with bounded linear backoff.
///
/// Attempt `n` is followed by a `backoff_base * n` sleep (a cancellable
/// suspension point). `PaymentRequired` is the only response that retries;
/// `Released` returns immediately and every `Err` aborts the loop
/// untouched — `Unauthorized` and friends never resolve by waiting.
///
/// # Errors
/// Whatever the endpoint surfaces, unchanged and unretried.
pub async fn claim_with_retry(
    endpoint: &dyn ClaimEndpoint,
    escrow_id: EscrowId,
    payout_address: AccountId,
    retry: RetryConfig,
) -> Result<ClaimOutcome> {
    for attempt in 1..=retry.max_attempts {
        let request = ClaimRequest::new(escrow_id, payout_address);
        match endpoint.claim(&request).await? {
            ClaimResponse::Released(released) => {
                info!(escrow = %escrow_id, attempt, reference = %released.settlement_ref, "claim released");
                return Ok(ClaimOutcome::Released(released));
            }
            ClaimResponse::PaymentRequired { reason } => {
                debug!(escrow = %escrow_id, attempt, %reason, "payment required, backing off");
                if attempt < retry.max_attempts {
                    tokio::time::sleep(retry.delay_after(attempt)).await;
                }
            }
        }
    }
    info!(escrow = %escrow_id, attempts = retry.max_attempts, "giving up; escrow remains live");
    Ok(ClaimOutcome::GaveUp {
        attempts: retry.max_attempts,
    })
}
