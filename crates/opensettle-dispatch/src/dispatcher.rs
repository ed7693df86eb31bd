//! The dual-path dispatcher: fan-out, first-wins, reclaim the rest.
//!
//! All paths receive the same signed instruction concurrently. The first
//! durable confirmation wins; the remaining attempts are cancelled on the
//! spot and every losing path holding a pre-paid incentive gets a
//! best-effort reclaim. The ledger's finality check is the true arbiter of
//! "did this actually settle" — no lock is shared between attempts.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{info, warn};

use opensettle_types::{Amount, OpensettleError, Result, SettlementRef, SignedInstruction};

use crate::path::DeliveryPath;

/// A confirmed dispatch: which path landed it, and how much unused
/// incentive came back.
#[derive(Debug, Clone)]
pub struct Confirmation {
    /// The settlement reference reported by the winning path.
    pub reference: SettlementRef,
    /// Name of the winning path.
    pub path: String,
    /// Total incentive reclaimed from losing paths.
    pub incentive_reclaimed: Amount,
}

/// Races a signed instruction across independent delivery paths.
pub struct Dispatcher {
    paths: Vec<Arc<dyn DeliveryPath>>,
    expiry: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over the given paths with a race expiry cap.
    ///
    /// The effective window per dispatch is the smaller of `expiry` and the
    /// instruction's own remaining validity.
    #[must_use]
    pub fn new(paths: Vec<Arc<dyn DeliveryPath>>, expiry: Duration) -> Self {
        Self { paths, expiry }
    }

    /// Number of configured paths.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Race the instruction to confirmation.
    ///
    /// # Errors
    /// - `Configuration` if no paths are configured
    /// - `InstructionExpired` if the validity window already elapsed
    /// - `DispatchFailed` if every path fails or the window runs out;
    ///   the caller must **not** resubmit — a partially landed transfer
    ///   would be duplicated.
    pub async fn dispatch(&self, instruction: &SignedInstruction) -> Result<Confirmation> {
        if self.paths.is_empty() {
            return Err(OpensettleError::Configuration(
                "dispatcher has no delivery paths".to_string(),
            ));
        }
        if instruction.is_expired() {
            return Err(OpensettleError::InstructionExpired);
        }
        let window = self.expiry.min(instruction.time_to_expiry());

        let mut attempts = FuturesUnordered::new();
        for (idx, path) in self.paths.iter().enumerate() {
            let path = Arc::clone(path);
            let instr = instruction.clone();
            attempts.push(async move { (idx, path.deliver(&instr).await) });
        }

        let mut failures: Vec<String> = Vec::new();
        let race = tokio::time::timeout(window, async {
            while let Some((idx, outcome)) = attempts.next().await {
                match outcome {
                    Ok(reference) => return Some((idx, reference)),
                    Err(err) => {
                        warn!(path = self.paths[idx].name(), %err, "delivery path failed");
                        failures.push(format!("{}: {err}", self.paths[idx].name()));
                    }
                }
            }
            None
        })
        .await;

        // Dropping the set aborts every attempt still in flight.
        drop(attempts);

        match race {
            Ok(Some((winner, reference))) => {
                let incentive_reclaimed = self.reclaim_losers(winner, instruction).await;
                info!(
                    escrow = %instruction.escrow_id,
                    path = self.paths[winner].name(),
                    reference = %reference,
                    reclaimed = %incentive_reclaimed,
                    "settlement confirmed"
                );
                Ok(Confirmation {
                    reference,
                    path: self.paths[winner].name().to_string(),
                    incentive_reclaimed,
                })
            }
            Ok(None) => Err(OpensettleError::DispatchFailed {
                reason: failures.join("; "),
            }),
            Err(_) => Err(OpensettleError::DispatchFailed {
                reason: format!(
                    "no path confirmed within the {}ms validity window",
                    window.as_millis()
                ),
            }),
        }
    }

    /// Best-effort incentive reclaim from every losing path that pre-paid
    /// one. Failures are logged, never propagated — the settlement itself
    /// already confirmed.
    async fn reclaim_losers(&self, winner: usize, instruction: &SignedInstruction) -> Amount {
        let mut total = Amount::ZERO;
        for (idx, path) in self.paths.iter().enumerate() {
            if idx == winner || path.incentive().is_zero() {
                continue;
            }
            match path.reclaim_incentive(instruction).await {
                Ok(amount) => {
                    info!(path = path.name(), %amount, "unused incentive reclaimed");
                    total = total.saturating_add(amount);
                }
                Err(err) => {
                    warn!(path = path.name(), %err, "incentive reclaim failed");
                }
            }
        }
        total
    }
}
