//! # opensettle-ledger
//!
//! **Escrow Plane**: durable escrow records and the conditional-write
//! discipline that makes every state transition atomic.
//!
//! ## Architecture
//!
//! Two layers:
//! 1. [`EscrowStore`]: the external ledger's key-value contract — records
//!    addressed by [`opensettle_types::EscrowId`], mutated only through
//!    atomic [`EscrowStore::transition`] conditional writes. The in-memory
//!    [`MemoryStore`] is the reference implementation; durable backends
//!    live behind the same trait.
//! 2. [`EscrowLedger`]: the accessor every other plane goes through. Adds
//!    what the raw store cannot know: ed25519 authority checks (only the
//!    designated worker submits proof, only the payer or a pre-authorized
//!    release agent finalizes) layered over the store's predecessor-state
//!    checks.
//!
//! Together the two checks substitute for a lock: optimistic concurrency
//! via versioned state, arbitrated by the ledger, never by an in-process
//! mutex shared between claimants.

pub mod accessor;
pub mod store;

pub use accessor::EscrowLedger;
pub use store::{EscrowStore, EscrowUpdate, MemoryStore};
