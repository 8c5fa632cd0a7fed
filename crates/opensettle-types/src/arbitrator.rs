//! Arbitrator record for the registry arena.
//!
//! Stakes here are plain decimals: arbitrator bonding is public information
//! even in a private-settlement deployment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// One registered arbitrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitratorRecord {
    /// The arbitrator's settlement account.
    pub account: AccountId,
    /// Bonded stake backing honest behavior.
    pub stake: Decimal,
    /// Whether the arbitrator is accepting panel assignments.
    pub active: bool,
    /// Number of disputes this arbitrator is currently seated on.
    /// Must be zero before the stake can leave the registry.
    pub assigned_disputes: u32,
}

impl ArbitratorRecord {
    /// A fresh, active record with no assignments.
    #[must_use]
    pub fn new(account: AccountId, stake: Decimal) -> Self {
        Self {
            account,
            stake,
            active: true,
            assigned_disputes: 0,
        }
    }

    /// Whether this arbitrator may be drawn onto a new panel.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.active
    }

    /// Whether stake may leave the registry (deregister or withdraw).
    #[must_use]
    pub fn can_release_stake(&self) -> bool {
        self.assigned_disputes == 0
    }
}
