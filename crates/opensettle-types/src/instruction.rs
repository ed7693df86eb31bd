//! Settlement instruction model.
//!
//! A `SignedInstruction` is the signed, unconfirmed release order the
//! dispatcher races across delivery paths. Its validity window mirrors the
//! external ledger's time-bound transaction validity — once `valid_until`
//! passes, no path may deliver it and the dispatch must fail rather than
//! blindly rebuild and resubmit.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AccountId, Amount, EscrowId, OpensettleError};

// ---------------------------------------------------------------------------
// SettlementRef
// ---------------------------------------------------------------------------

/// Confirmation identifier returned once a release transaction is durably
/// confirmed by a delivery path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementRef(pub String);

impl SettlementRef {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SettlementRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl fmt::Display for SettlementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SignedInstruction
// ---------------------------------------------------------------------------

/// A signed settlement instruction, ready for delivery.
///
/// Owned exclusively by the dispatcher from submission until it resolves to
/// confirmed or failed. The same instruction bytes go to every path — the
/// paths differ only in routing and incentive, never in payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInstruction {
    /// The escrow this instruction settles.
    pub escrow_id: EscrowId,
    /// Canonical transfer payload (see [`transfer_payload`]).
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
    /// The release authority that signed the payload.
    pub authority: AccountId,
    /// Ed25519 signature over `payload`.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
    /// Hard validity deadline, mirroring the ledger's transaction TTL.
    pub valid_until: DateTime<Utc>,
}

impl SignedInstruction {
    /// Whether the validity window has elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.valid_until
    }

    /// Time remaining before expiry, clamped at zero.
    #[must_use]
    pub fn time_to_expiry(&self) -> std::time::Duration {
        (self.valid_until - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Verify the authority's signature over the payload.
    ///
    /// # Errors
    /// Returns `SignatureInvalid` if the signature does not verify.
    pub fn verify_signature(&self) -> crate::Result<()> {
        let key = self.authority.verifying_key()?;
        let sig_bytes: [u8; 64] =
            self.signature
                .as_slice()
                .try_into()
                .map_err(|_| OpensettleError::SignatureInvalid {
                    reason: format!("expected 64-byte signature, got {}", self.signature.len()),
                })?;
        let signature = Signature::from_bytes(&sig_bytes);
        key.verify(&self.payload, &signature)
            .map_err(|e| OpensettleError::SignatureInvalid {
                reason: format!("instruction signature rejected: {e}"),
            })
    }
}

/// Canonical release payload: pay `amount` from the escrow to the worker.
///
/// Format: `"opensettle:transfer:v1:" || escrow_id || payer || worker || amount_le`
#[must_use]
pub fn transfer_payload(
    escrow_id: &EscrowId,
    payer: &AccountId,
    worker: &AccountId,
    amount: Amount,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(128);
    payload.extend_from_slice(b"opensettle:transfer:v1:");
    payload.extend_from_slice(escrow_id.as_bytes());
    payload.extend_from_slice(payer.as_bytes());
    payload.extend_from_slice(worker.as_bytes());
    payload.extend_from_slice(&amount.0.to_le_bytes());
    payload
}
