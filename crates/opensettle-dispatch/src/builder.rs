//! Settlement instruction builder.
//!
//! Produces the canonical release payload for an escrow, signs it with the
//! release authority's key, and stamps the validity window. The built
//! instruction is what every delivery path receives — paths never alter the
//! payload.

use std::time::Duration;

use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};

use opensettle_types::{
    AccountId, EscrowRecord, OpensettleError, Result, SignedInstruction, transfer_payload,
};

/// Builds signed, time-bounded settlement instructions.
pub struct InstructionBuilder {
    signing_key: SigningKey,
    authority: AccountId,
    validity: Duration,
}

impl InstructionBuilder {
    /// Create a builder signing as the given release authority.
    #[must_use]
    pub fn new(signing_key: SigningKey, validity: Duration) -> Self {
        let authority = AccountId::from_verifying_key(&signing_key.verifying_key());
        Self {
            signing_key,
            authority,
            validity,
        }
    }

    /// The account this builder signs as.
    #[must_use]
    pub fn authority(&self) -> AccountId {
        self.authority
    }

    /// Build the release instruction for a finalized escrow: pay the full
    /// locked amount to the recorded worker.
    ///
    /// # Errors
    /// Returns `Configuration` if the validity window does not fit the
    /// timestamp arithmetic (effectively unreachable for sane windows).
    pub fn build_release(&self, record: &EscrowRecord) -> Result<SignedInstruction> {
        let payload = transfer_payload(
            &record.escrow_id,
            &record.payer,
            &record.worker,
            record.amount,
        );
        let signature = self.signing_key.sign(&payload).to_bytes().to_vec();
        let validity = chrono::Duration::from_std(self.validity).map_err(|e| {
            OpensettleError::Configuration(format!("instruction validity window: {e}"))
        })?;
        Ok(SignedInstruction {
            escrow_id: record.escrow_id,
            payload,
            authority: self.authority,
            signature,
            valid_until: Utc::now() + validity,
        })
    }
}
