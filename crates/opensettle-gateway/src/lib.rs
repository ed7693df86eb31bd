//! # opensettle-gateway
//!
//! **Claim Plane**: the protocol's policy core — "no proof, no payment".
//!
//! ## Architecture
//!
//! A claim flows through three checks and one action:
//! 1. [`PaymentGateway`] verifies the payout address against the escrow's
//!    recorded worker (identity mismatch is an error, not a 402)
//! 2. [`ProofVerifier`] reads the ledger; an absent or malformed proof
//!    yields `PaymentRequired` — the expected, retryable 402 response,
//!    with **no** ledger mutation
//! 3. The ledger `finalize` runs under the store's atomic state check;
//!    `AlreadyFinalized` on a completed record is reinterpreted as success
//!    (idempotent claim — the recorded settlement reference is returned)
//! 4. The dispatcher races the release instruction to confirmation, the
//!    reference is recorded on the ledger, and the registry is notified
//!    best-effort
//!
//! The gateway is stateless and horizontally replicable: correctness rests
//! entirely on the ledger's conditional writes, never on in-process state.

pub mod gateway;
pub mod http;
pub mod registry;
pub mod verifier;

pub use gateway::PaymentGateway;
pub use http::{AppState, router, serve};
pub use registry::{HttpRegistryNotifier, NullNotifier, RegistryNotifier};
pub use verifier::ProofVerifier;
