//! # Escrow record — the authoritative unit of state
//!
//! An `EscrowRecord` holds funds a payer locked for one task. It lives on
//! the external ledger, addressed by its deterministic [`EscrowId`], and is
//! only ever mutated through the Escrow Plane's conditional writes.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  submit_proof   ┌─────────────────┐  finalize   ┌───────────┐
//!   │ PENDING ├────────────────▶│ PROOF_SUBMITTED ├────────────▶│ COMPLETED │
//!   └────┬────┘                 └────────┬────────┘             └───────────┘
//!        │ cancel                        │ cancel
//!        ▼                               ▼
//!   ┌───────────┐                 ┌───────────┐
//!   │ CANCELLED │                 │ CANCELLED │
//!   └───────────┘                 └───────────┘
//! ```
//!
//! ## Security Properties
//!
//! - **Monotonic transitions**: no state is ever skipped or re-entered
//! - **Terminal finality**: COMPLETED and CANCELLED are permanent — once
//!   funds are released there is no reversal
//! - **Write-once digest**: the proof digest is set at the
//!   PENDING → PROOF_SUBMITTED transition and never cleared or replaced,
//!   so a worker cannot substitute a different proof after submission
//! - **Immutable amount**: locked at creation, constant for the record's
//!   lifetime

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{
    Amount, AccountId, EscrowId, OpensettleError, SettlementRef, TaskHash, constants,
};

/// The lifecycle state of an escrow record.
///
/// Transitions are **monotonic** (never go backwards):
/// - `Pending → ProofSubmitted` (worker recorded a proof digest)
/// - `ProofSubmitted → Completed` (settlement released the funds)
/// - `Pending | ProofSubmitted → Cancelled` (payer reclaimed a stalled escrow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Funds are locked; no proof has been recorded yet.
    Pending,
    /// The worker recorded a proof digest. Funds still locked.
    ProofSubmitted,
    /// Settlement released the funds to the worker. **Irreversible.**
    Completed,
    /// The payer reclaimed the funds before release. **Irreversible.**
    Cancelled,
}

impl EscrowStatus {
    /// Can this record transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::ProofSubmitted | Self::Cancelled)
                | (Self::ProofSubmitted, Self::Completed | Self::Cancelled)
        )
    }

    /// Terminal states admit no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::ProofSubmitted => write!(f, "PROOF_SUBMITTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ---------------------------------------------------------------------------
// ProofDigest
// ---------------------------------------------------------------------------

/// Fixed-length hash asserting completion of work.
///
/// Only the digest is recorded on the ledger — proof content is never
/// persisted by this protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofDigest(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl ProofDigest {
    /// Digest of the raw proof content bytes.
    #[must_use]
    pub fn of(proof: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(proof);
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Structural well-formedness: fixed length (by type) and non-zero.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0 != [0u8; 32]
    }
}

impl fmt::Display for ProofDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proof:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// EscrowRecord
// ---------------------------------------------------------------------------

/// The on-ledger escrow record.
///
/// Never deleted by the protocol — its terminal state is permanent audit
/// evidence on the external ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Deterministic id, derived from `(payer, worker, task_hash)`.
    pub escrow_id: EscrowId,
    /// The account that locked the funds.
    pub payer: AccountId,
    /// The account performing the task; sole party allowed to submit proof
    /// and sole recipient of the release.
    pub worker: AccountId,
    /// Locked amount in minor units. `> 0` and immutable.
    pub amount: Amount,
    /// Hash of the task description (part of the id derivation).
    pub task_hash: TaskHash,
    /// Free-text service descriptor. Display only, not load-bearing.
    pub task_label: String,
    /// Current lifecycle state.
    pub status: EscrowStatus,
    /// Set exactly once, at the PENDING → PROOF_SUBMITTED transition.
    pub proof_digest: Option<ProofDigest>,
    /// Confirmation reference of the release transaction, recorded after a
    /// successful dispatch. What makes repeated claims idempotent.
    pub settlement_ref: Option<SettlementRef>,
    /// When the payer locked the funds.
    pub created_at: DateTime<Utc>,
    /// When the proof digest was recorded.
    pub proof_at: Option<DateTime<Utc>>,
    /// When the record reached a terminal state.
    pub finalized_at: Option<DateTime<Utc>>,
}

impl EscrowRecord {
    /// Open a new escrow in `Pending` state.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is zero
    /// - `TaskLabelTooLong` if the label exceeds the on-ledger limit
    pub fn open(
        payer: AccountId,
        worker: AccountId,
        amount: Amount,
        task_hash: TaskHash,
        task_label: impl Into<String>,
    ) -> crate::Result<Self> {
        if amount.is_zero() {
            return Err(OpensettleError::InvalidAmount {
                reason: "escrow amount must be greater than zero".to_string(),
            });
        }
        let task_label = task_label.into();
        if task_label.len() > constants::MAX_TASK_LABEL_BYTES {
            return Err(OpensettleError::TaskLabelTooLong {
                len: task_label.len(),
            });
        }
        Ok(Self {
            escrow_id: EscrowId::derive(&payer, &worker, &task_hash),
            payer,
            worker,
            amount,
            task_hash,
            task_label,
            status: EscrowStatus::Pending,
            proof_digest: None,
            settlement_ref: None,
            created_at: Utc::now(),
            proof_at: None,
            finalized_at: None,
        })
    }

    /// Whether the record has reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Canonical signing payloads
// ---------------------------------------------------------------------------

/// Canonical payload a worker signs when submitting a proof digest.
///
/// Format: `"opensettle:proof:v1:" || escrow_id || digest`
#[must_use]
pub fn proof_signing_payload(escrow_id: &EscrowId, digest: &ProofDigest) -> Vec<u8> {
    let mut payload = Vec::with_capacity(96);
    payload.extend_from_slice(b"opensettle:proof:v1:");
    payload.extend_from_slice(escrow_id.as_bytes());
    payload.extend_from_slice(&digest.0);
    payload
}

/// Canonical payload an authority signs when finalizing an escrow.
///
/// Format: `"opensettle:finalize:v1:" || escrow_id || outcome`
#[must_use]
pub fn finalize_signing_payload(escrow_id: &EscrowId, outcome: EscrowStatus) -> Vec<u8> {
    let mut payload = Vec::with_capacity(64);
    payload.extend_from_slice(b"opensettle:finalize:v1:");
    payload.extend_from_slice(escrow_id.as_bytes());
    payload.extend_from_slice(outcome.to_string().as_bytes());
    payload
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Dummy record and key material for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl EscrowRecord {
    /// Create a dummy pending escrow with a random task.
    pub fn dummy(payer: AccountId, worker: AccountId, amount: Amount) -> Self {
        let task: [u8; 32] = rand::random();
        Self::open(payer, worker, amount, TaskHash::from_bytes(task), "dummy-task")
            .expect("dummy escrow parameters are valid")
    }
}

/// Generate an ed25519 keypair for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[must_use]
pub fn dummy_keypair() -> (ed25519_dalek::SigningKey, AccountId) {
    let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let account = AccountId::from_verifying_key(&signing.verifying_key());
    (signing, account)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(byte: u8) -> AccountId {
        AccountId::from_pubkey([byte; 32])
    }

    #[test]
    fn status_transitions_valid() {
        assert!(EscrowStatus::Pending.can_transition_to(EscrowStatus::ProofSubmitted));
        assert!(EscrowStatus::Pending.can_transition_to(EscrowStatus::Cancelled));
        assert!(EscrowStatus::ProofSubmitted.can_transition_to(EscrowStatus::Completed));
        assert!(EscrowStatus::ProofSubmitted.can_transition_to(EscrowStatus::Cancelled));
    }

    #[test]
    fn status_transitions_invalid() {
        // No skipping.
        assert!(!EscrowStatus::Pending.can_transition_to(EscrowStatus::Completed));
        // Terminal states admit nothing.
        assert!(!EscrowStatus::Completed.can_transition_to(EscrowStatus::Cancelled));
        assert!(!EscrowStatus::Completed.can_transition_to(EscrowStatus::Pending));
        assert!(!EscrowStatus::Cancelled.can_transition_to(EscrowStatus::ProofSubmitted));
        assert!(!EscrowStatus::Cancelled.can_transition_to(EscrowStatus::Completed));
    }

    #[test]
    fn open_rejects_zero_amount() {
        let err = EscrowRecord::open(
            acct(1),
            acct(2),
            Amount::ZERO,
            TaskHash::of(b"t"),
            "job",
        )
        .unwrap_err();
        assert!(matches!(err, OpensettleError::InvalidAmount { .. }));
    }

    #[test]
    fn open_rejects_oversized_label() {
        let label = "x".repeat(constants::MAX_TASK_LABEL_BYTES + 1);
        let err = EscrowRecord::open(
            acct(1),
            acct(2),
            Amount::new(10),
            TaskHash::of(b"t"),
            label,
        )
        .unwrap_err();
        assert!(matches!(err, OpensettleError::TaskLabelTooLong { .. }));
    }

    #[test]
    fn open_derives_id_and_starts_pending() {
        let task = TaskHash::of(b"translate");
        let record =
            EscrowRecord::open(acct(1), acct(2), Amount::new(8), task, "translate").unwrap();
        assert_eq!(record.escrow_id, EscrowId::derive(&acct(1), &acct(2), &task));
        assert_eq!(record.status, EscrowStatus::Pending);
        assert!(record.proof_digest.is_none());
        assert!(record.settlement_ref.is_none());
    }

    #[test]
    fn zero_digest_is_malformed() {
        assert!(!ProofDigest::from_bytes([0u8; 32]).is_well_formed());
        assert!(ProofDigest::of(b"real work output").is_well_formed());
    }

    #[test]
    fn proof_payload_binds_escrow_and_digest() {
        let id_a = EscrowId::from_bytes([1; 32]);
        let id_b = EscrowId::from_bytes([2; 32]);
        let digest = ProofDigest::of(b"output");
        assert_ne!(
            proof_signing_payload(&id_a, &digest),
            proof_signing_payload(&id_b, &digest)
        );
        assert_ne!(
            proof_signing_payload(&id_a, &digest),
            proof_signing_payload(&id_a, &ProofDigest::of(b"other"))
        );
    }

    #[test]
    fn finalize_payload_binds_outcome() {
        let id = EscrowId::from_bytes([1; 32]);
        assert_ne!(
            finalize_signing_payload(&id, EscrowStatus::Completed),
            finalize_signing_payload(&id, EscrowStatus::Cancelled)
        );
    }

    #[test]
    fn serde_roundtrip() {
        let record = EscrowRecord::dummy(acct(1), acct(2), Amount::new(100));
        let json = serde_json::to_string(&record).unwrap();
        let back: EscrowRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.escrow_id, back.escrow_id);
        assert_eq!(record.amount, back.amount);
        assert_eq!(record.status, back.status);
    }
}
