//! The escrow ledger accessor — the only write path to escrow records.
//!
//! Every mutation carries an authority check (who may do this) plus the
//! store's precondition-state check (from which state). The accessor never
//! bypasses [`EscrowStore::transition`], so a concurrent conflicting write
//! always loses at the store, never silently succeeds.

use std::sync::Arc;

use ed25519_dalek::Signature;
use tracing::{info, warn};

use opensettle_types::{
    AccountId, Amount, EscrowId, EscrowRecord, EscrowStatus, OpensettleError, ProofDigest, Result,
    SettlementRef, TaskHash, finalize_signing_payload, proof_signing_payload,
};

use crate::store::{EscrowStore, EscrowUpdate};

/// Authority-checked accessor over an [`EscrowStore`].
///
/// Stateless apart from its configuration; clones share the store.
#[derive(Clone)]
pub struct EscrowLedger {
    store: Arc<dyn EscrowStore>,
    /// Accounts allowed to finalize on top of the escrow's own payer
    /// (the pre-authorized release rule, e.g. the gateway's release agent).
    release_authorities: Vec<AccountId>,
}

impl EscrowLedger {
    #[must_use]
    pub fn new(store: Arc<dyn EscrowStore>) -> Self {
        Self {
            store,
            release_authorities: Vec::new(),
        }
    }

    /// Register an account allowed to finalize any escrow.
    #[must_use]
    pub fn with_release_authority(mut self, authority: AccountId) -> Self {
        self.release_authorities.push(authority);
        self
    }

    /// Open an escrow: the payer locks `amount` for `(worker, task_hash)`.
    ///
    /// # Errors
    /// - `InvalidAmount` on a zero amount
    /// - `DuplicateEscrow` if this triple already has an escrow
    pub async fn create(
        &self,
        payer: AccountId,
        worker: AccountId,
        amount: Amount,
        task_hash: TaskHash,
        task_label: impl Into<String> + Send,
    ) -> Result<EscrowId> {
        let record = EscrowRecord::open(payer, worker, amount, task_hash, task_label)?;
        let escrow_id = record.escrow_id;
        self.store.insert_new(record).await?;
        info!(escrow = %escrow_id, %payer, %worker, %amount, "escrow created");
        Ok(escrow_id)
    }

    /// Read a record.
    ///
    /// # Errors
    /// `EscrowNotFound` for unknown ids.
    pub async fn read(&self, escrow_id: &EscrowId) -> Result<EscrowRecord> {
        self.store
            .get(escrow_id)
            .await?
            .ok_or(OpensettleError::EscrowNotFound(*escrow_id))
    }

    /// Record the worker's proof digest: `Pending → ProofSubmitted`.
    ///
    /// The signature must verify against the escrow's **worker** key over
    /// the canonical proof payload. A second submission is rejected by the
    /// store's state check — the first digest is never overwritten.
    ///
    /// # Errors
    /// - `MalformedProof` for a structurally invalid digest
    /// - `SignatureInvalid` / `Unauthorized` on a bad signer
    /// - `InvalidState` unless the record is `Pending`
    pub async fn submit_proof(
        &self,
        escrow_id: &EscrowId,
        digest: ProofDigest,
        signature: &Signature,
    ) -> Result<()> {
        if !digest.is_well_formed() {
            return Err(OpensettleError::MalformedProof {
                reason: "proof digest must be non-zero".to_string(),
            });
        }

        let record = self.read(escrow_id).await?;
        let payload = proof_signing_payload(escrow_id, &digest);
        verify_signer(&record.worker, &payload, signature, "worker")?;

        // The status precondition is re-checked atomically in the store; a
        // racing second submission fails there, not here.
        self.store
            .transition(escrow_id, EscrowUpdate::SetProof(digest))
            .await?;
        info!(escrow = %escrow_id, %digest, "proof digest recorded");
        Ok(())
    }

    /// Move the record to a terminal state.
    ///
    /// `Completed` requires `ProofSubmitted`; `Cancelled` requires
    /// `Pending` or `ProofSubmitted`. The signer must be the escrow's payer
    /// or a registered release authority.
    ///
    /// # Errors
    /// - `Unauthorized` / `SignatureInvalid` on a bad signer
    /// - `AlreadyFinalized` if the record is already terminal
    /// - `InvalidState` on any other precondition failure
    pub async fn finalize(
        &self,
        escrow_id: &EscrowId,
        outcome: EscrowStatus,
        authority: AccountId,
        signature: &Signature,
    ) -> Result<EscrowRecord> {
        if !outcome.is_terminal() {
            return Err(OpensettleError::InvalidState {
                expected: "COMPLETED or CANCELLED".to_string(),
                actual: outcome,
            });
        }

        let record = self.read(escrow_id).await?;
        if authority != record.payer && !self.release_authorities.contains(&authority) {
            warn!(escrow = %escrow_id, %authority, "finalize attempt by unauthorized account");
            return Err(OpensettleError::Unauthorized {
                reason: format!(
                    "{authority} is neither the payer nor an authorized release agent"
                ),
            });
        }
        let payload = finalize_signing_payload(escrow_id, outcome);
        verify_signer(&authority, &payload, signature, "authority")?;

        let updated = self
            .store
            .transition(escrow_id, EscrowUpdate::Finalize(outcome))
            .await?;
        info!(escrow = %escrow_id, %outcome, "escrow finalized");
        Ok(updated)
    }

    /// Attach the settlement confirmation to a `Completed` record.
    /// First write wins; the returned record carries the stored reference.
    pub async fn record_settlement(
        &self,
        escrow_id: &EscrowId,
        reference: SettlementRef,
    ) -> Result<EscrowRecord> {
        self.store
            .transition(escrow_id, EscrowUpdate::RecordSettlement(reference))
            .await
    }
}

fn verify_signer(
    account: &AccountId,
    payload: &[u8],
    signature: &Signature,
    role: &str,
) -> Result<()> {
    let key = account.verifying_key()?;
    key.verify_strict(payload, signature)
        .map_err(|_| OpensettleError::SignatureInvalid {
            reason: format!("signature does not verify against the {role} key {account}"),
        })
}
