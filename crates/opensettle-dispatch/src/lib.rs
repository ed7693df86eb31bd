//! # opensettle-dispatch
//!
//! **Delivery Plane**: builds, signs, and races settlement instructions
//! across independent delivery paths.
//!
//! ## Architecture
//!
//! A single delivery path has a non-trivial failure rate under load, so the
//! dispatcher submits the *same* signed instruction to every configured
//! path at effectively the same time:
//!
//! 1. [`InstructionBuilder`]: canonical payload + ed25519 signature +
//!    validity window (mirroring the ledger's transaction TTL)
//! 2. [`DeliveryPath`]: one independent submission route; the priority
//!    variant carries a pre-paid incentive and a reclaim operation
//! 3. [`Dispatcher`]: fan-out/first-wins race — the first durable
//!    confirmation wins, losing attempts are cancelled, and incentives
//!    pre-paid to losing paths are reclaimed ("never pay for priority
//!    delivery that did not end up being needed")
//!
//! A dispatch that exhausts every path **fails** and is surfaced to the
//! caller; it is never transparently resubmitted, because re-sending a
//! state-changing instruction risks a logically-duplicate transfer.

pub mod builder;
pub mod dispatcher;
pub mod path;
pub mod relay;

pub use builder::InstructionBuilder;
pub use dispatcher::{Confirmation, Dispatcher};
pub use path::DeliveryPath;
pub use relay::JsonRpcRelay;
