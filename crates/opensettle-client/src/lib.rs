//! # opensettle-client
//!
//! **Worker side**: issue claims against a Payment Gateway and retry
//! through the expected 402 window.
//!
//! The gateway's `PaymentRequired` answer is not a failure — it is the
//! protocol saying "not yet". [`claim_with_retry`] sleeps through a bounded
//! number of those with linear backoff; every actual error (identity
//! mismatch, unknown escrow, dispatch failure) aborts immediately, because
//! that class of failure will not resolve by waiting.

pub mod http;
pub mod retry;

pub use http::GatewayClient;
pub use retry::{ClaimEndpoint, ClaimOutcome, claim_with_retry};
