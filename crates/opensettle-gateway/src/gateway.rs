//! The payment gateway — "payment required until proof verified".
//!
//! `claim` composes verifier + ledger + dispatcher under one contract:
//! at most one fund transfer per escrow, ever, enforced jointly by the
//! ledger's atomic state check and the idempotent reinterpretation of
//! `AlreadyFinalized`. The gateway keeps no per-claim state — any instance
//! can service any claim, and restarts are safe.

use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::{Signer, SigningKey};
use tracing::{info, warn};

use opensettle_dispatch::{DeliveryPath, Dispatcher, InstructionBuilder};
use opensettle_ledger::{EscrowLedger, EscrowStore};
use opensettle_types::{
    AccountId, ClaimRequest, ClaimResponse, DispatchConfig, EscrowId, EscrowRecord, EscrowStatus,
    JobCompleted, OpensettleError, ProofStatus, Released, Result, constants,
    finalize_signing_payload,
};

use crate::registry::RegistryNotifier;
use crate::verifier::ProofVerifier;

/// The claim policy core.
pub struct PaymentGateway {
    ledger: EscrowLedger,
    verifier: ProofVerifier,
    dispatcher: Dispatcher,
    builder: InstructionBuilder,
    signing_key: SigningKey,
    authority: AccountId,
    notifier: Arc<dyn RegistryNotifier>,
}

impl PaymentGateway {
    /// Wire a gateway over an escrow store and delivery paths.
    ///
    /// The gateway's signing key acts as a pre-authorized release agent: it
    /// is registered with the ledger accessor and signs both the `finalize`
    /// transition and the settlement instruction.
    pub fn new(
        store: Arc<dyn EscrowStore>,
        signing_key: SigningKey,
        paths: Vec<Arc<dyn DeliveryPath>>,
        dispatch: DispatchConfig,
        notifier: Arc<dyn RegistryNotifier>,
    ) -> Self {
        let authority = AccountId::from_verifying_key(&signing_key.verifying_key());
        let ledger = EscrowLedger::new(store).with_release_authority(authority);
        let verifier = ProofVerifier::new(ledger.clone());
        let dispatcher = Dispatcher::new(paths, dispatch.expiry());
        let builder = InstructionBuilder::new(signing_key.clone(), dispatch.expiry());
        Self {
            ledger,
            verifier,
            dispatcher,
            builder,
            signing_key,
            authority,
            notifier,
        }
    }

    /// The ledger accessor this gateway operates through. Payer and worker
    /// flows (create, submit_proof, cancel) go through the same accessor.
    #[must_use]
    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    /// The gateway's release-agent account.
    #[must_use]
    pub fn authority(&self) -> AccountId {
        self.authority
    }

    /// Verify the proof recorded for an escrow (read-only).
    pub async fn verify(&self, escrow_id: &EscrowId) -> Result<ProofStatus> {
        self.verifier.verify(escrow_id).await
    }

    /// Claim the escrow's payout.
    ///
    /// Safe to call concurrently or repeatedly for the same escrow: exactly
    /// one call performs the transfer, every successful call returns the
    /// identical `Released`.
    ///
    /// # Errors
    /// - `EscrowNotFound` for unknown ids
    /// - `Unauthorized` when the payout address is not the recorded worker
    ///   (an identity problem, not a proof problem — never a 402)
    /// - `DispatchFailed` when the release settled on the ledger but no
    ///   delivery path confirmed — requires reconciliation, not retry
    pub async fn claim(&self, request: &ClaimRequest) -> Result<ClaimResponse> {
        let record = self.ledger.read(&request.escrow_id).await?;

        if request.payout_address != record.worker {
            warn!(
                claim = %request.claim_id,
                escrow = %request.escrow_id,
                payout = %request.payout_address,
                "claim with mismatched payout address"
            );
            return Err(OpensettleError::Unauthorized {
                reason: format!(
                    "payout address {} does not match the escrow's worker",
                    request.payout_address
                ),
            });
        }

        // A cancelled escrow can never release; answering 402 would send
        // the claimant into a retry loop that cannot resolve.
        if record.status == EscrowStatus::Cancelled {
            return Err(OpensettleError::InvalidState {
                expected: "PENDING, PROOF_SUBMITTED, or COMPLETED".to_string(),
                actual: record.status,
            });
        }

        match self.verifier.verify(&request.escrow_id).await? {
            ProofStatus::Verified => {}
            ProofStatus::NotSubmitted => {
                return Ok(ClaimResponse::PaymentRequired {
                    reason: "proof not submitted".to_string(),
                });
            }
            ProofStatus::Malformed => {
                return Ok(ClaimResponse::PaymentRequired {
                    reason: "proof digest failed structural checks".to_string(),
                });
            }
        }

        let payload = finalize_signing_payload(&request.escrow_id, EscrowStatus::Completed);
        let signature = self.signing_key.sign(&payload);
        match self
            .ledger
            .finalize(
                &request.escrow_id,
                EscrowStatus::Completed,
                self.authority,
                &signature,
            )
            .await
        {
            Ok(finalized) => {
                let released = self.release(&finalized).await?;
                info!(
                    claim = %request.claim_id,
                    escrow = %request.escrow_id,
                    reference = %released.settlement_ref,
                    "payment released"
                );
                Ok(ClaimResponse::Released(released))
            }
            // A prior claim already completed the release. Idempotent
            // success: hand back the recorded settlement reference.
            Err(OpensettleError::AlreadyFinalized(_)) => {
                let released = self.replay_release(&request.escrow_id).await?;
                info!(
                    claim = %request.claim_id,
                    escrow = %request.escrow_id,
                    reference = %released.settlement_ref,
                    "claim replayed against completed escrow"
                );
                Ok(ClaimResponse::Released(released))
            }
            Err(err) => Err(err),
        }
    }

    /// Dispatch the release for a freshly finalized record, record the
    /// settlement reference, and notify the registry.
    async fn release(&self, record: &EscrowRecord) -> Result<Released> {
        let instruction = self.builder.build_release(record)?;
        let confirmation = self.dispatcher.dispatch(&instruction).await?;

        let updated = self
            .ledger
            .record_settlement(&record.escrow_id, confirmation.reference)
            .await?;
        let settlement_ref =
            updated
                .settlement_ref
                .ok_or_else(|| OpensettleError::Internal(
                    "settlement reference missing after recording".to_string(),
                ))?;

        let fact = JobCompleted {
            worker_id: record.worker,
            payer_id: record.payer,
            amount: record.amount,
        };
        if let Err(err) = self.notifier.job_completed(&fact).await {
            warn!(escrow = %record.escrow_id, %err, "registry sync failed (best-effort)");
        }

        Ok(Released {
            escrow_id: record.escrow_id,
            amount: record.amount,
            settlement_ref,
        })
    }

    /// Resolve a claim that lost the finalize race. The winner's dispatch
    /// may still be in flight, so poll briefly for its recorded reference.
    async fn replay_release(&self, escrow_id: &EscrowId) -> Result<Released> {
        let mut record = self.ledger.read(escrow_id).await?;
        if record.status == EscrowStatus::Cancelled {
            // Terminal state does not match the intended outcome.
            return Err(OpensettleError::InvalidState {
                expected: "COMPLETED".to_string(),
                actual: record.status,
            });
        }

        let mut polls = 0;
        loop {
            if let Some(settlement_ref) = record.settlement_ref {
                return Ok(Released {
                    escrow_id: *escrow_id,
                    amount: record.amount,
                    settlement_ref,
                });
            }
            polls += 1;
            if polls >= constants::SETTLEMENT_POLL_ATTEMPTS {
                return Err(OpensettleError::SettlementPending(*escrow_id));
            }
            tokio::time::sleep(Duration::from_millis(constants::SETTLEMENT_POLL_INTERVAL_MS))
                .await;
            record = self.ledger.read(escrow_id).await?;
        }
    }
}
