//! Supply conservation invariant checker.
//!
//! Mathematical invariant enforced by the audit path:
//! ```text
//! ∀ asset: Σ(available + locked + claimable) == Σ(deposits) - Σ(withdrawals)
//! ```
//!
//! Escrow settlement only ever moves value between accounts, locks, and
//! claimable pools; if this invariant ever breaks, the engine's bookkeeping
//! has gone catastrophically wrong and the host must halt.

use std::collections::HashMap;

use opensettle_types::{Amount, Asset, Result, SettleError};

/// Tracks per-asset supply totals and validates conservation on demand.
#[derive(Debug, Clone)]
pub struct SupplyConservation<A: Amount> {
    /// Total deposits per asset since genesis.
    deposits: HashMap<Asset, A>,
    /// Total withdrawals per asset since genesis.
    withdrawals: HashMap<Asset, A>,
}

impl<A: Amount> SupplyConservation<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            deposits: HashMap::new(),
            withdrawals: HashMap::new(),
        }
    }

    /// Record a deposit.
    pub fn record_deposit(&mut self, asset: &str, amount: &A) -> Result<()> {
        let entry = self
            .deposits
            .entry(asset.to_string())
            .or_insert_with(A::zero);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    /// Record a withdrawal.
    pub fn record_withdrawal(&mut self, asset: &str, amount: &A) -> Result<()> {
        let entry = self
            .withdrawals
            .entry(asset.to_string())
            .or_insert_with(A::zero);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    /// Expected total supply for an asset: deposits - withdrawals.
    pub fn expected_supply(&self, asset: &str) -> Result<A> {
        let deposited = self.deposits.get(asset).cloned().unwrap_or_else(A::zero);
        let withdrawn = self
            .withdrawals
            .get(asset)
            .cloned()
            .unwrap_or_else(A::zero);
        deposited.checked_sub(&withdrawn)
    }

    /// Verify that the actual supply matches the expected supply.
    ///
    /// # Errors
    /// Returns [`SettleError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, asset: &str, actual_supply: &A) -> Result<()> {
        let expected = self.expected_supply(asset)?;
        if *actual_supply != expected {
            return Err(SettleError::SupplyInvariantViolation {
                reason: format!(
                    "asset {asset}: actual supply {actual_supply} != expected {expected}"
                ),
            });
        }
        Ok(())
    }
}

impl<A: Amount> Default for SupplyConservation<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensettle_types::PlainAmount;

    #[test]
    fn empty_supply_is_zero() {
        let sc: SupplyConservation<PlainAmount> = SupplyConservation::new();
        assert!(sc.expected_supply("USDC").unwrap().is_zero());
        assert!(sc.verify("USDC", &PlainAmount::zero()).is_ok());
    }

    #[test]
    fn deposits_increase_expected() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("USDC", &PlainAmount::from(1_000u64)).unwrap();
        sc.record_deposit("USDC", &PlainAmount::from(500u64)).unwrap();
        assert_eq!(
            sc.expected_supply("USDC").unwrap(),
            PlainAmount::from(1_500u64)
        );
    }

    #[test]
    fn withdrawals_decrease_expected() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("USDC", &PlainAmount::from(1_000u64)).unwrap();
        sc.record_withdrawal("USDC", &PlainAmount::from(300u64)).unwrap();
        assert_eq!(
            sc.expected_supply("USDC").unwrap(),
            PlainAmount::from(700u64)
        );
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("USDC", &PlainAmount::from(10u64)).unwrap();
        let err = sc.verify("USDC", &PlainAmount::from(11u64)).unwrap_err();
        assert!(matches!(err, SettleError::SupplyInvariantViolation { .. }));
    }

    #[test]
    fn multiple_assets_independent() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("USDC", &PlainAmount::from(50_000u64)).unwrap();
        sc.record_deposit("XOM", &PlainAmount::from(5u64)).unwrap();
        assert!(sc.verify("USDC", &PlainAmount::from(50_000u64)).is_ok());
        assert!(sc.verify("XOM", &PlainAmount::from(5u64)).is_ok());
    }
}
