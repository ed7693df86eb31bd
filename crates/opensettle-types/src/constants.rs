//! System-wide constants for the OpenSettle protocol.

/// Proof digest length in bytes (SHA-256).
pub const PROOF_DIGEST_LEN: usize = 32;

/// Maximum task label length in bytes (the on-ledger record limit).
pub const MAX_TASK_LABEL_BYTES: usize = 64;

/// Default gateway API listen port.
pub const DEFAULT_API_PORT: u16 = 8402;

/// Default maximum claim attempts before the client gives up.
pub const DEFAULT_MAX_CLAIM_ATTEMPTS: u32 = 5;

/// Default linear backoff base between claim attempts (milliseconds).
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Default settlement instruction validity window (milliseconds),
/// mirroring the external ledger's transaction TTL.
pub const DEFAULT_DISPATCH_EXPIRY_MS: u64 = 60_000;

/// Default priority incentive pre-paid to the incentivized delivery path
/// (minor units).
pub const DEFAULT_PRIORITY_INCENTIVE: u64 = 5_000;

/// Poll interval while waiting for a concurrent claim's settlement
/// reference to land (milliseconds).
pub const SETTLEMENT_POLL_INTERVAL_MS: u64 = 25;

/// Maximum polls before a missing settlement reference is surfaced as an
/// error requiring reconciliation.
pub const SETTLEMENT_POLL_ATTEMPTS: u32 = 40;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenSettle";
