//! Token amounts in integer minor units.
//!
//! The external ledger denominates the settlement token in `u64` minor
//! units; no fractional arithmetic exists anywhere in the protocol, so the
//! amount type is a checked-arithmetic newtype rather than a decimal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of the settlement token, in minor units.
///
/// Escrow amounts are locked at creation and immutable for the record's
/// lifetime; the only arithmetic the protocol performs is incentive
/// accounting in the dispatcher, which uses the checked helpers below.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn new(minor_units: u64) -> Self {
        Self(minor_units)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(minor_units: u64) -> Self {
        Self(minor_units)
    }
}
