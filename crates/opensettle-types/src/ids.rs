//! Globally unique identifiers used throughout OpenSettle.
//!
//! `EscrowId` is derived deterministically from the escrow's parties and
//! task, `AccountId` is an ed25519 public key on the external ledger, and
//! `ClaimId` uses UUIDv7 for time-ordered log correlation.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::OpensettleError;

// ---------------------------------------------------------------------------
// EscrowId
// ---------------------------------------------------------------------------

/// Deterministic escrow identifier.
///
/// Derived as `SHA-256("opensettle:escrow:v1:" || payer || worker || task_hash)`.
/// Every node derives the **exact same** id for the same
/// `(payer, worker, task_hash)` triple, which is what guarantees one escrow
/// per task and blocks replay under a different task label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EscrowId(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl EscrowId {
    /// Derive the escrow id for a `(payer, worker, task_hash)` triple.
    #[must_use]
    pub fn derive(payer: &AccountId, worker: &AccountId, task_hash: &TaskHash) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"opensettle:escrow:v1:");
        hasher.update(payer.0);
        hasher.update(worker.0);
        hasher.update(task_hash.0);
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex encoding (the wire / URL form).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow:{}", hex::encode(&self.0[..8]))
    }
}

impl FromStr for EscrowId {
    type Err = OpensettleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::serde_hex::decode(s)
            .map(Self)
            .map_err(|reason| OpensettleError::InvalidIdentifier { reason })
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// An account on the external ledger: the raw ed25519 public key (32 bytes).
///
/// Payers, workers, and release agents are all addressed this way; signature
/// checks resolve the key directly from the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl AccountId {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    /// Resolve the ed25519 verifying key for this account.
    ///
    /// # Errors
    /// Returns `SignatureInvalid` if the bytes are not a valid curve point.
    pub fn verifying_key(&self) -> crate::Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).map_err(|e| OpensettleError::SignatureInvalid {
            reason: format!("account {self} is not a valid ed25519 key: {e}"),
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0[..8]))
    }
}

impl FromStr for AccountId {
    type Err = OpensettleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::serde_hex::decode(s)
            .map(Self)
            .map_err(|reason| OpensettleError::InvalidIdentifier { reason })
    }
}

// ---------------------------------------------------------------------------
// TaskHash
// ---------------------------------------------------------------------------

/// SHA-256 digest of the task description the escrow pays for.
///
/// Part of the `EscrowId` derivation — two escrows between the same parties
/// for different tasks never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TaskHash(#[serde(with = "crate::serde_hex")] pub [u8; 32]);

impl TaskHash {
    /// Hash arbitrary task description bytes.
    #[must_use]
    pub fn of(task: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"opensettle:task:v1:");
        hasher.update(task);
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TaskHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// ClaimId
// ---------------------------------------------------------------------------

/// Correlation id for a single claim request. Uses UUIDv7 so gateway logs
/// sort by arrival time. Not load-bearing for protocol correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ClaimId(pub Uuid);

impl ClaimId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "claim:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
