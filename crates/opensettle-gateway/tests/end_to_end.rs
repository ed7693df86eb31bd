//! End-to-end tests across all three planes.
//!
//! These exercise the full protocol lifecycle:
//! Escrow Plane (ledger) -> Claim Plane (gateway) -> Delivery Plane (dispatch)
//!
//! They verify the properties the protocol promises in realistic scenarios:
//! exactly one transfer per escrow under concurrent claims, the 402 claim
//! loop, write-once proofs, no reversal after release, and the dual-path
//! race with incentive reclaim.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};

use opensettle_client::{ClaimEndpoint, ClaimOutcome, claim_with_retry};
use opensettle_dispatch::DeliveryPath;
use opensettle_gateway::{NullNotifier, PaymentGateway};
use opensettle_ledger::MemoryStore;
use opensettle_types::*;

// =============================================================================
// Test delivery paths
// =============================================================================

/// Confirms after `delay_ms`, counting every completed delivery.
struct CountingPath {
    name: &'static str,
    delay_ms: u64,
    incentive: Amount,
    delivered: AtomicU32,
    reclaimed: AtomicU64,
}

impl CountingPath {
    fn new(name: &'static str, delay_ms: u64, incentive: u64) -> Arc<Self> {
        Arc::new(Self {
            name,
            delay_ms,
            incentive: Amount::new(incentive),
            delivered: AtomicU32::new(0),
            reclaimed: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl DeliveryPath for CountingPath {
    fn name(&self) -> &str {
        self.name
    }

    fn incentive(&self) -> Amount {
        self.incentive
    }

    async fn deliver(&self, instruction: &SignedInstruction) -> Result<SettlementRef> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(SettlementRef::from(format!(
            "{}-{}",
            self.name,
            instruction.escrow_id.short()
        )))
    }

    async fn reclaim_incentive(&self, _instruction: &SignedInstruction) -> Result<Amount> {
        self.reclaimed.fetch_add(self.incentive.0, Ordering::SeqCst);
        Ok(self.incentive)
    }
}

/// Always fails.
struct DeadPath;

#[async_trait]
impl DeliveryPath for DeadPath {
    fn name(&self) -> &str {
        "dead"
    }

    async fn deliver(&self, _instruction: &SignedInstruction) -> Result<SettlementRef> {
        Err(OpensettleError::RelayRejected {
            path: "dead".to_string(),
            reason: "permanently down".to_string(),
        })
    }
}

/// In-process adapter so the claim client can drive the gateway directly.
struct InProcessEndpoint {
    gateway: Arc<PaymentGateway>,
    calls: AtomicU32,
}

#[async_trait]
impl ClaimEndpoint for InProcessEndpoint {
    async fn claim(&self, request: &ClaimRequest) -> Result<ClaimResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gateway.claim(request).await
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Protocol {
    gateway: Arc<PaymentGateway>,
    payer_key: SigningKey,
    payer: AccountId,
    worker_key: SigningKey,
    worker: AccountId,
}

impl Protocol {
    fn with_paths(paths: Vec<Arc<dyn DeliveryPath>>) -> Self {
        let (gateway_key, _) = dummy_keypair();
        let (payer_key, payer) = dummy_keypair();
        let (worker_key, worker) = dummy_keypair();
        let gateway = Arc::new(PaymentGateway::new(
            Arc::new(MemoryStore::new()),
            gateway_key,
            paths,
            DispatchConfig::default(),
            Arc::new(NullNotifier),
        ));
        Self {
            gateway,
            payer_key,
            payer,
            worker_key,
            worker,
        }
    }

    fn new() -> Self {
        Self::with_paths(vec![CountingPath::new("standard", 1, 0) as Arc<dyn DeliveryPath>])
    }

    async fn open_escrow(&self, amount: u64, task: &[u8]) -> EscrowId {
        self.gateway
            .ledger()
            .create(
                self.payer,
                self.worker,
                Amount::new(amount),
                TaskHash::of(task),
                String::from_utf8_lossy(task),
            )
            .await
            .expect("escrow creation should succeed")
    }

    async fn submit_proof(&self, escrow_id: &EscrowId, proof: &[u8]) -> Result<ProofDigest> {
        let digest = ProofDigest::of(proof);
        let signature = self
            .worker_key
            .sign(&proof_signing_payload(escrow_id, &digest));
        self.gateway
            .ledger()
            .submit_proof(escrow_id, digest, &signature)
            .await?;
        Ok(digest)
    }

    async fn cancel(&self, escrow_id: &EscrowId) -> Result<EscrowRecord> {
        let signature = self
            .payer_key
            .sign(&finalize_signing_payload(escrow_id, EscrowStatus::Cancelled));
        self.gateway
            .ledger()
            .finalize(escrow_id, EscrowStatus::Cancelled, self.payer, &signature)
            .await
    }

    async fn claim(&self, escrow_id: EscrowId) -> Result<ClaimResponse> {
        self.gateway
            .claim(&ClaimRequest::new(escrow_id, self.worker))
            .await
    }
}

// =============================================================================
// Test: full lifecycle, idempotent claim
// =============================================================================

#[tokio::test]
async fn e2e_full_lifecycle_with_idempotent_claim() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"translate 500 words").await;

    protocol.submit_proof(&escrow_id, b"translated text").await.unwrap();

    let first = protocol.claim(escrow_id).await.unwrap();
    let ClaimResponse::Released(released) = &first else {
        panic!("expected release, got {first:?}");
    };
    assert_eq!(released.amount, Amount::new(8));

    // Claiming again transfers nothing and returns the identical response.
    let second = protocol.claim(escrow_id).await.unwrap();
    assert_eq!(first, second);

    let record = protocol.gateway.ledger().read(&escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Completed);
    assert_eq!(record.settlement_ref.as_ref(), Some(&released.settlement_ref));
}

// =============================================================================
// Test: concurrent claims, exactly one transfer
// =============================================================================

#[tokio::test]
async fn e2e_concurrent_claims_transfer_exactly_once() {
    let path = CountingPath::new("standard", 5, 0);
    let protocol = Protocol::with_paths(vec![Arc::clone(&path) as Arc<dyn DeliveryPath>]);
    let escrow_id = protocol.open_escrow(100, b"render video").await;
    protocol.submit_proof(&escrow_id, b"frames").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let gateway = Arc::clone(&protocol.gateway);
        let worker = protocol.worker;
        handles.push(tokio::spawn(async move {
            gateway.claim(&ClaimRequest::new(escrow_id, worker)).await
        }));
    }

    let mut responses = Vec::new();
    for handle in handles {
        responses.push(handle.await.unwrap().unwrap());
    }

    // Exactly one instruction was ever delivered...
    assert_eq!(path.delivered.load(Ordering::SeqCst), 1);
    // ...and all eight claimants saw the identical release.
    let first = &responses[0];
    assert!(first.is_released());
    for response in &responses {
        assert_eq!(response, first);
    }
}

// =============================================================================
// Test: the 402 loop — claim early, retry, proof lands, release
// =============================================================================

#[tokio::test]
async fn e2e_claim_before_proof_is_payment_required_never_error() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"summarize report").await;

    for _ in 0..3 {
        let response = protocol.claim(escrow_id).await.unwrap();
        assert!(
            matches!(response, ClaimResponse::PaymentRequired { .. }),
            "claim before proof must be the 402 answer, got {response:?}"
        );
    }

    // No transfer, no state change, escrow still live.
    let record = protocol.gateway.ledger().read(&escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Pending);
    assert!(record.settlement_ref.is_none());
}

#[tokio::test]
async fn e2e_retry_loop_survives_the_wait_and_releases() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"classify images").await;

    // The worker finishes and submits its proof while the claim loop is
    // already polling.
    let endpoint = Arc::new(InProcessEndpoint {
        gateway: Arc::clone(&protocol.gateway),
        calls: AtomicU32::new(0),
    });
    let submitter = {
        let worker_key = protocol.worker_key.clone();
        let gateway = Arc::clone(&protocol.gateway);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let digest = ProofDigest::of(b"labels");
            let signature = worker_key.sign(&proof_signing_payload(&escrow_id, &digest));
            gateway
                .ledger()
                .submit_proof(&escrow_id, digest, &signature)
                .await
                .unwrap();
        })
    };

    let outcome = claim_with_retry(
        endpoint.as_ref(),
        escrow_id,
        protocol.worker,
        RetryConfig {
            max_attempts: 10,
            backoff_base_ms: 100,
        },
    )
    .await
    .unwrap();
    submitter.await.unwrap();

    assert!(matches!(outcome, ClaimOutcome::Released(_)));
    // At least one 402 round-trip happened before the release.
    assert!(endpoint.calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn e2e_exhausted_retries_leave_escrow_live() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"never finished").await;

    let endpoint = InProcessEndpoint {
        gateway: Arc::clone(&protocol.gateway),
        calls: AtomicU32::new(0),
    };
    let outcome = claim_with_retry(
        &endpoint,
        escrow_id,
        protocol.worker,
        RetryConfig {
            max_attempts: 3,
            backoff_base_ms: 10,
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ClaimOutcome::GaveUp { attempts: 3 });
    // "GaveUp" means live, not failed: a later proof still releases.
    protocol.submit_proof(&escrow_id, b"late output").await.unwrap();
    let response = protocol.claim(escrow_id).await.unwrap();
    assert!(response.is_released());
}

// =============================================================================
// Test: identity mismatch is an error and is never retried
// =============================================================================

#[tokio::test]
async fn e2e_wrong_payout_address_aborts_without_retry() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"audit contract").await;
    protocol.submit_proof(&escrow_id, b"findings").await.unwrap();

    let (_, stranger) = dummy_keypair();
    let endpoint = InProcessEndpoint {
        gateway: Arc::clone(&protocol.gateway),
        calls: AtomicU32::new(0),
    };
    let err = claim_with_retry(
        &endpoint,
        escrow_id,
        stranger,
        RetryConfig {
            max_attempts: 5,
            backoff_base_ms: 10,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OpensettleError::Unauthorized { .. }));
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1, "no retry on identity errors");
    // The legitimate worker still gets paid.
    let response = protocol.claim(escrow_id).await.unwrap();
    assert!(response.is_released());
}

// =============================================================================
// Test: write-once proof, no reversal after release
// =============================================================================

#[tokio::test]
async fn e2e_second_proof_rejected_and_first_digest_survives() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"compile dataset").await;

    let first = protocol.submit_proof(&escrow_id, b"the real output").await.unwrap();
    let err = protocol
        .submit_proof(&escrow_id, b"a substituted output")
        .await
        .unwrap_err();
    assert!(matches!(err, OpensettleError::InvalidState { .. }));

    let record = protocol.gateway.ledger().read(&escrow_id).await.unwrap();
    assert_eq!(record.proof_digest, Some(first));
}

#[tokio::test]
async fn e2e_no_cancel_after_release() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"deliver model").await;
    protocol.submit_proof(&escrow_id, b"weights").await.unwrap();
    protocol.claim(escrow_id).await.unwrap();

    let err = protocol.cancel(&escrow_id).await.unwrap_err();
    assert!(matches!(err, OpensettleError::AlreadyFinalized(_)));
    let record = protocol.gateway.ledger().read(&escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Completed);
}

#[tokio::test]
async fn e2e_cancelled_escrow_cannot_be_claimed() {
    let protocol = Protocol::new();
    let escrow_id = protocol.open_escrow(8, b"abandoned job").await;
    protocol.cancel(&escrow_id).await.unwrap();

    // Not a 402: a cancelled escrow can never pay out, so retrying would
    // be pointless. The claimant gets a terminal state conflict instead.
    let err = protocol.claim(escrow_id).await.unwrap_err();
    assert!(matches!(err, OpensettleError::InvalidState { .. }));
}

// =============================================================================
// Test: dual-path race with incentive reclaim
// =============================================================================

#[tokio::test]
async fn e2e_standard_path_win_reclaims_priority_incentive() {
    let standard = CountingPath::new("standard", 10, 0);
    let priority = CountingPath::new("priority", 80, 5_000);
    let protocol = Protocol::with_paths(vec![
        Arc::clone(&standard) as Arc<dyn DeliveryPath>,
        Arc::clone(&priority) as Arc<dyn DeliveryPath>,
    ]);
    let escrow_id = protocol.open_escrow(8, b"urgent job").await;
    protocol.submit_proof(&escrow_id, b"output").await.unwrap();

    let response = protocol.claim(escrow_id).await.unwrap();
    let ClaimResponse::Released(released) = response else {
        panic!("expected release");
    };
    // The standard path's confirmation won the race...
    assert!(released.settlement_ref.as_str().starts_with("standard-"));
    // ...and the priority path's pre-paid incentive came back in full.
    assert_eq!(priority.reclaimed.load(Ordering::SeqCst), 5_000);
    assert_eq!(priority.delivered.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Test: dispatch failure surfaces as an error, never a silent retry
// =============================================================================

#[tokio::test]
async fn e2e_dispatch_failure_requires_reconciliation() {
    let protocol = Protocol::with_paths(vec![Arc::new(DeadPath), Arc::new(DeadPath)]);
    let escrow_id = protocol.open_escrow(8, b"doomed job").await;
    protocol.submit_proof(&escrow_id, b"output").await.unwrap();

    let err = protocol.claim(escrow_id).await.unwrap_err();
    assert!(matches!(err, OpensettleError::DispatchFailed { .. }));

    // The ledger finalized but no settlement landed — the record is in the
    // reconciliation state, not silently rolled back.
    let record = protocol.gateway.ledger().read(&escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Completed);
    assert!(record.settlement_ref.is_none());
}
