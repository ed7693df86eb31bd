//! Error types for the OpenSettle protocol.
//!
//! All errors use the `OS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Escrow record / ledger errors
//! - 2xx: Authority / proof errors
//! - 4xx: Dispatch errors
//! - 5xx: Transport / gateway errors
//! - 9xx: General / internal errors
//!
//! `PaymentRequired` is deliberately **absent**: a missing or unverified
//! proof is an expected, retryable claim response
//! ([`crate::ClaimResponse::PaymentRequired`]), not an error.

use thiserror::Error;

use crate::{EscrowId, EscrowStatus};

/// Central error enum for all OpenSettle operations.
#[derive(Debug, Error)]
pub enum OpensettleError {
    // =================================================================
    // Escrow Record / Ledger Errors (1xx)
    // =================================================================
    /// No escrow record exists under this id.
    #[error("OS_ERR_100: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// An escrow already exists for this (payer, worker, task_hash) triple.
    #[error("OS_ERR_101: Escrow already exists: {0}")]
    DuplicateEscrow(EscrowId),

    /// The operation's predecessor-state precondition failed.
    #[error("OS_ERR_102: Invalid escrow state: expected {expected}, got {actual}")]
    InvalidState {
        expected: String,
        actual: EscrowStatus,
    },

    /// The record is already in a terminal state.
    #[error("OS_ERR_103: Escrow already finalized: {0}")]
    AlreadyFinalized(EscrowId),

    /// The escrow amount failed validation (zero at creation).
    #[error("OS_ERR_104: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// An identifier failed to parse (bad hex, wrong length).
    #[error("OS_ERR_105: Invalid identifier: {reason}")]
    InvalidIdentifier { reason: String },

    /// The task label exceeds the on-ledger size limit.
    #[error("OS_ERR_106: Task label too long: {len} bytes")]
    TaskLabelTooLong { len: usize },

    // =================================================================
    // Authority / Proof Errors (2xx)
    // =================================================================
    /// The caller is not the party this operation is reserved for.
    /// Never retried — waiting will not change the caller's identity.
    #[error("OS_ERR_200: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// An ed25519 signature failed verification.
    #[error("OS_ERR_201: Signature verification failed: {reason}")]
    SignatureInvalid { reason: String },

    /// The submitted proof digest failed structural checks.
    #[error("OS_ERR_202: Malformed proof: {reason}")]
    MalformedProof { reason: String },

    // =================================================================
    // Dispatch Errors (4xx)
    // =================================================================
    /// Every delivery path failed before the instruction expired.
    /// Requires external reconciliation — never auto-resubmitted.
    #[error("OS_ERR_400: Dispatch failed: {reason}")]
    DispatchFailed { reason: String },

    /// The settlement instruction's validity window elapsed.
    #[error("OS_ERR_401: Settlement instruction expired")]
    InstructionExpired,

    /// Reclaiming an unused priority incentive failed.
    #[error("OS_ERR_402: Incentive reclaim failed on path {path}: {reason}")]
    ReclaimFailed { path: String, reason: String },

    /// A delivery path rejected the instruction.
    #[error("OS_ERR_403: Relay {path} rejected instruction: {reason}")]
    RelayRejected { path: String, reason: String },

    // =================================================================
    // Transport / Gateway Errors (5xx)
    // =================================================================
    /// Network-level failure talking to a relay, registry, or gateway.
    #[error("OS_ERR_500: Transport error: {reason}")]
    Transport { reason: String },

    /// The gateway returned a non-402 error response.
    #[error("OS_ERR_501: Gateway rejected request: HTTP {status}: {message}")]
    GatewayRejected { status: u16, message: String },

    /// The record is Completed but no settlement reference has been
    /// recorded yet — a concurrent release is still in flight, or its
    /// dispatch failed and the escrow needs reconciliation.
    #[error("OS_ERR_502: Settlement reference not yet recorded for {0}")]
    SettlementPending(EscrowId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("OS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid flags, missing key material, etc.).
    #[error("OS_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("OS_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpensettleError>;

impl From<std::io::Error> for OpensettleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OpensettleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl OpensettleError {
    /// Whether a claim caller may meaningfully retry after this error.
    ///
    /// Only transport-level failures qualify; identity and state conflicts
    /// will not resolve by waiting.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = OpensettleError::EscrowNotFound(EscrowId::from_bytes([0xab; 32]));
        let msg = format!("{err}");
        assert!(msg.starts_with("OS_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn invalid_state_display() {
        let err = OpensettleError::InvalidState {
            expected: "PENDING".to_string(),
            actual: EscrowStatus::Completed,
        };
        let msg = format!("{err}");
        assert!(msg.contains("OS_ERR_102"));
        assert!(msg.contains("PENDING"));
        assert!(msg.contains("COMPLETED"));
    }

    #[test]
    fn all_errors_have_os_err_prefix() {
        let id = EscrowId::from_bytes([1; 32]);
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(OpensettleError::DuplicateEscrow(id)),
            Box::new(OpensettleError::AlreadyFinalized(id)),
            Box::new(OpensettleError::Unauthorized {
                reason: "test".into(),
            }),
            Box::new(OpensettleError::DispatchFailed {
                reason: "test".into(),
            }),
            Box::new(OpensettleError::InstructionExpired),
            Box::new(OpensettleError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("OS_ERR_"),
                "Error missing OS_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn only_transport_is_transient() {
        assert!(
            OpensettleError::Transport {
                reason: "refused".into()
            }
            .is_transient()
        );
        assert!(
            !OpensettleError::Unauthorized {
                reason: "wrong key".into()
            }
            .is_transient()
        );
        assert!(
            !OpensettleError::DispatchFailed {
                reason: "expired".into()
            }
            .is_transient()
        );
    }
}
