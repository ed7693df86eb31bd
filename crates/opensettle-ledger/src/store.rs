//! Conditional-write escrow store.
//!
//! The external ledger is modeled as a key-value store with one guarantee:
//! a transition is applied only if the record's current status is a valid
//! predecessor for it. Everything the protocol promises about "at most one
//! release, ever" reduces to this check running atomically per record.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use opensettle_types::{
    EscrowId, EscrowRecord, EscrowStatus, OpensettleError, ProofDigest, Result, SettlementRef,
};

/// A conditional state update, applied atomically by the store.
#[derive(Debug, Clone)]
pub enum EscrowUpdate {
    /// Record the proof digest: `Pending → ProofSubmitted`. Write-once.
    SetProof(ProofDigest),
    /// Move to a terminal state (`Completed` or `Cancelled`).
    Finalize(EscrowStatus),
    /// Attach the settlement confirmation to a `Completed` record.
    /// First write wins; recording again returns the stored reference.
    RecordSettlement(SettlementRef),
}

/// The external ledger's contract: durable records keyed by escrow id,
/// mutated only through atomic conditional writes.
#[async_trait]
pub trait EscrowStore: Send + Sync {
    /// Insert a freshly opened record.
    ///
    /// # Errors
    /// Returns `DuplicateEscrow` if a record already exists under this id —
    /// the one-escrow-per-task collision guarantee.
    async fn insert_new(&self, record: EscrowRecord) -> Result<()>;

    /// Fetch a record by id.
    async fn get(&self, id: &EscrowId) -> Result<Option<EscrowRecord>>;

    /// Apply `update` iff the record's current status is a valid
    /// predecessor for it, returning the updated record.
    ///
    /// # Errors
    /// - `EscrowNotFound` for unknown ids
    /// - `AlreadyFinalized` when the record is terminal and the update is
    ///   not (the conflicting-finalize signal the gateway reinterprets)
    /// - `InvalidState` for any other precondition failure
    async fn transition(&self, id: &EscrowId, update: EscrowUpdate) -> Result<EscrowRecord>;
}

/// In-memory reference store.
///
/// A single async mutex over the record map makes every transition atomic,
/// which is exactly the per-record guarantee a durable backend provides via
/// conditional writes.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<EscrowId, EscrowRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl EscrowStore for MemoryStore {
    async fn insert_new(&self, record: EscrowRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.escrow_id) {
            return Err(OpensettleError::DuplicateEscrow(record.escrow_id));
        }
        records.insert(record.escrow_id, record);
        Ok(())
    }

    async fn get(&self, id: &EscrowId) -> Result<Option<EscrowRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn transition(&self, id: &EscrowId, update: EscrowUpdate) -> Result<EscrowRecord> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or(OpensettleError::EscrowNotFound(*id))?;
        apply(record, update)?;
        Ok(record.clone())
    }
}

/// The single place transition preconditions are enforced.
fn apply(record: &mut EscrowRecord, update: EscrowUpdate) -> Result<()> {
    match update {
        EscrowUpdate::SetProof(digest) => {
            if record.status != EscrowStatus::Pending {
                return Err(state_conflict(record, "PENDING"));
            }
            record.proof_digest = Some(digest);
            record.status = EscrowStatus::ProofSubmitted;
            record.proof_at = Some(Utc::now());
        }
        EscrowUpdate::Finalize(outcome) => {
            if !outcome.is_terminal() {
                return Err(OpensettleError::InvalidState {
                    expected: "COMPLETED or CANCELLED".to_string(),
                    actual: outcome,
                });
            }
            if record.status.is_terminal() {
                return Err(OpensettleError::AlreadyFinalized(record.escrow_id));
            }
            if !record.status.can_transition_to(outcome) {
                return Err(state_conflict(record, "PROOF_SUBMITTED"));
            }
            record.status = outcome;
            record.finalized_at = Some(Utc::now());
        }
        EscrowUpdate::RecordSettlement(reference) => {
            if record.status != EscrowStatus::Completed {
                return Err(state_conflict(record, "COMPLETED"));
            }
            // First write wins; concurrent claimants read back the stored one.
            if record.settlement_ref.is_none() {
                record.settlement_ref = Some(reference);
            }
        }
    }
    Ok(())
}

fn state_conflict(record: &EscrowRecord, expected: &str) -> OpensettleError {
    if record.status.is_terminal() {
        OpensettleError::AlreadyFinalized(record.escrow_id)
    } else {
        OpensettleError::InvalidState {
            expected: expected.to_string(),
            actual: record.status,
        }
    }
}
