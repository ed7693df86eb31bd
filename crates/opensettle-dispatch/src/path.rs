//! The delivery path abstraction.

use async_trait::async_trait;

use opensettle_types::{Amount, Result, SettlementRef, SignedInstruction};

/// One independent route for submitting a signed instruction to the
/// external ledger.
///
/// Paths are interchangeable from the dispatcher's point of view: they take
/// the same instruction payload and either confirm it durably or fail. A
/// priority path additionally carries a pre-paid incentive, reclaimable
/// when the path loses the race.
#[async_trait]
pub trait DeliveryPath: Send + Sync {
    /// Short path name for logs and failure reports.
    fn name(&self) -> &str;

    /// Incentive pre-paid for priority treatment on this path.
    /// Zero for standard paths.
    fn incentive(&self) -> Amount {
        Amount::ZERO
    }

    /// Submit the instruction and wait for durable confirmation.
    async fn deliver(&self, instruction: &SignedInstruction) -> Result<SettlementRef>;

    /// Reclaim the pre-paid incentive after losing the race.
    ///
    /// Returns the amount reclaimed. The default (for paths without an
    /// incentive) reclaims nothing.
    async fn reclaim_incentive(&self, instruction: &SignedInstruction) -> Result<Amount> {
        let _ = instruction;
        Ok(Amount::ZERO)
    }
}
