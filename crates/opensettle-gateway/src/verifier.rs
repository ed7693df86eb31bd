//! Proof verification against the ledger.

use opensettle_ledger::EscrowLedger;
use opensettle_types::{EscrowId, ProofStatus, Result};

/// Checks whether an escrow carries a structurally valid proof digest.
///
/// Read-only and side-effect free: the claim retry loop may call this
/// arbitrarily often without affecting ledger state.
#[derive(Clone)]
pub struct ProofVerifier {
    ledger: EscrowLedger,
}

impl ProofVerifier {
    #[must_use]
    pub fn new(ledger: EscrowLedger) -> Self {
        Self { ledger }
    }

    /// Tri-state verification of the escrow's recorded proof.
    ///
    /// No digest (the record is still `Pending`, or was cancelled before
    /// submission) → `NotSubmitted`. A recorded digest is checked
    /// structurally — fixed length by construction, non-zero by rule; the
    /// failure case is defensive, the ledger's write-once transition should
    /// never admit it.
    ///
    /// # Errors
    /// `EscrowNotFound` for unknown ids.
    pub async fn verify(&self, escrow_id: &EscrowId) -> Result<ProofStatus> {
        let record = self.ledger.read(escrow_id).await?;
        Ok(match record.proof_digest {
            None => ProofStatus::NotSubmitted,
            Some(digest) if digest.is_well_formed() => ProofStatus::Verified,
            Some(_) => ProofStatus::Malformed,
        })
    }
}
