//! Basis-point fee computation and exact N-way splitting.
//!
//! Every fee-charging call site in the engine — the marketplace fee, the
//! arbitration fee, and forfeited-stake distribution — goes through the one
//! [`split`] routine, so the split policy cannot drift between sites. The
//! integer-division remainder is assigned to the first (primary) recipient:
//! outputs always sum **exactly** to the input, with zero dust loss.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, Result, SettleError, constants::BPS_DENOMINATOR};

/// Which fee schedule produced a collection. Carried on `FeeCollected`
/// events so every fund movement is attributable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeKind {
    /// Marketplace fee on a seller-directed release.
    Marketplace,
    /// Arbitration fee on any disputed resolution, either direction.
    Arbitration,
    /// A losing disputant's forfeited stake.
    ForfeitedStake,
}

impl std::fmt::Display for FeeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Marketplace => write!(f, "MARKETPLACE"),
            Self::Arbitration => write!(f, "ARBITRATION"),
            Self::ForfeitedStake => write!(f, "FORFEITED_STAKE"),
        }
    }
}

/// One recipient's slice of a fee schedule, in basis points.
///
/// Share tables are validated once at configuration time; the first entry is
/// the primary recipient and absorbs the rounding remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeShare {
    pub recipient: AccountId,
    pub bps: u32,
}

impl FeeShare {
    #[must_use]
    pub fn new(recipient: AccountId, bps: u32) -> Self {
        Self { recipient, bps }
    }
}

/// The result of splitting a fee: per-recipient amounts summing exactly to
/// the input. Value type, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct FeeDistribution<A: Amount> {
    /// Ordered `(recipient, value)` pairs; first entry holds the remainder.
    pub shares: Vec<(AccountId, A)>,
}

impl<A: Amount> FeeDistribution<A> {
    /// Sum of all share values.
    pub fn total(&self) -> Result<A> {
        let mut sum = A::zero();
        for (_, value) in &self.shares {
            sum = sum.checked_add(value)?;
        }
        Ok(sum)
    }

    /// Shares with a non-zero value (the ones that move funds).
    pub fn nonzero_shares(&self) -> impl Iterator<Item = &(AccountId, A)> {
        self.shares.iter().filter(|(_, v)| !v.is_zero())
    }
}

/// Validate a share table: non-empty and summing to exactly 10 000 bps.
pub fn validate_shares(shares: &[FeeShare]) -> Result<()> {
    if shares.is_empty() {
        return Err(SettleError::InvalidConfig {
            reason: "fee share table is empty".to_string(),
        });
    }
    let total: u64 = shares.iter().map(|s| u64::from(s.bps)).sum();
    if total != u64::from(BPS_DENOMINATOR) {
        return Err(SettleError::InvalidConfig {
            reason: format!("fee shares sum to {total} bps, expected {BPS_DENOMINATOR}"),
        });
    }
    Ok(())
}

/// Compute a fee of `fee_bps` basis points of `amount`.
///
/// # Errors
/// Rejects `fee_bps > 10_000` with `InvalidInput`.
pub fn fee_of<A: Amount>(amount: &A, fee_bps: u32) -> Result<A> {
    amount.bps_share(fee_bps)
}

/// Split `fee` across `shares` with exact conservation.
///
/// Each recipient gets `floor(fee * bps / 10_000)`; the remainder is added
/// to the first recipient so the outputs sum exactly to `fee`.
///
/// # Errors
/// - `InvalidConfig` if the share table is empty or does not sum to 10 000
/// - `AmountOverflow` if the amount arithmetic fails
pub fn split<A: Amount>(fee: &A, shares: &[FeeShare]) -> Result<FeeDistribution<A>> {
    validate_shares(shares)?;

    let mut out: Vec<(AccountId, A)> = Vec::with_capacity(shares.len());
    let mut distributed = A::zero();
    for share in shares {
        let value = fee.bps_share(share.bps)?;
        distributed = distributed.checked_add(&value)?;
        out.push((share.recipient, value));
    }

    // Exact conservation: the primary recipient absorbs the remainder.
    let remainder = fee.checked_sub(&distributed)?;
    if !remainder.is_zero() {
        let first = &mut out[0];
        first.1 = first.1.checked_add(&remainder)?;
    }

    Ok(FeeDistribution { shares: out })
}
