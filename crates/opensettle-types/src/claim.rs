//! Claim request/response model for the Payment Gateway.
//!
//! A claim is the worker's "pay me" call. The gateway's answer is either a
//! release, or the protocol's 402-equivalent: *payment required until the
//! proof verifies* — an expected, retryable response, never an error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AccountId, Amount, ClaimId, EscrowId, SettlementRef};

/// A worker's claim against an escrow. Transient — the gateway persists
/// nothing about it; the ledger is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// The escrow being claimed.
    pub escrow_id: EscrowId,
    /// Where the release should pay out. Must match the escrow's recorded
    /// worker identity.
    pub payout_address: AccountId,
    /// Correlation id for logs. Generated if the caller omits it.
    #[serde(default)]
    pub claim_id: ClaimId,
}

impl ClaimRequest {
    #[must_use]
    pub fn new(escrow_id: EscrowId, payout_address: AccountId) -> Self {
        Self {
            escrow_id,
            payout_address,
            claim_id: ClaimId::new(),
        }
    }
}

/// A successful release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Released {
    pub escrow_id: EscrowId,
    /// The full locked amount — escrows release in whole, never partially.
    pub amount: Amount,
    /// Confirmation reference of the settlement transaction.
    pub settlement_ref: SettlementRef,
}

/// The gateway's answer to a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimResponse {
    /// Funds released (or already released — repeated claims return the
    /// identical response).
    Released(Released),
    /// No verified proof yet. The HTTP surface maps this to `402`.
    PaymentRequired { reason: String },
}

impl ClaimResponse {
    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released(_))
    }
}

/// Tri-state result of a proof verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofStatus {
    /// A structurally valid digest is on the ledger.
    Verified,
    /// No digest has been recorded yet.
    NotSubmitted,
    /// A digest is recorded but fails structural checks.
    Malformed,
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "VERIFIED"),
            Self::NotSubmitted => write!(f, "NOT_SUBMITTED"),
            Self::Malformed => write!(f, "MALFORMED"),
        }
    }
}

/// The "job completed" fact emitted to the external registry after a
/// release. Display/statistics only — not part of the payment invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCompleted {
    pub worker_id: AccountId,
    pub payer_id: AccountId,
    pub amount: Amount,
}
