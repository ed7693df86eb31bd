//! # opensettle-types
//!
//! Shared types, errors, and configuration for the **OpenSettle**
//! proof-gated escrow payment protocol.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`EscrowId`], [`AccountId`], [`TaskHash`], [`ClaimId`]
//! - **Escrow model**: [`EscrowRecord`], [`EscrowStatus`], [`ProofDigest`]
//! - **Amount model**: [`Amount`] (integer minor units)
//! - **Claim model**: [`ClaimRequest`], [`ClaimResponse`], [`Released`], [`ProofStatus`]
//! - **Instruction model**: [`SignedInstruction`], [`SettlementRef`]
//! - **Configuration**: [`GatewayConfig`], [`DispatchConfig`], [`RetryConfig`]
//! - **Errors**: [`OpensettleError`] with `OS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod ids;
pub mod instruction;

pub(crate) mod serde_hex;

// Re-export all primary types at crate root for ergonomic imports:
//   use opensettle_types::{EscrowRecord, EscrowStatus, ClaimRequest, ...};

pub use amount::*;
pub use claim::*;
pub use config::*;
pub use error::*;
pub use escrow::*;
pub use ids::*;
pub use instruction::*;

// Constants are accessed via `opensettle_types::constants::FOO`
// (not re-exported to avoid name collisions).
