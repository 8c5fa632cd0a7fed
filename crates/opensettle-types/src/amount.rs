//! The abstract amount arithmetic that the whole engine is generic over.
//!
//! The escrow state machine, fee splitter, and ledger do not care whether an
//! amount is a plain decimal or an opaque encrypted-arithmetic handle; they
//! only need checked add/sub, basis-point shares, and ordering. There is
//! exactly **one** state machine for both encodings — the public and the
//! private settlement variants differ only in their `Amount` parameter, so
//! fee handling can never drift between them.
//!
//! Two implementations ship here:
//! - [`PlainAmount`]: `rust_decimal` backed, the normal public deployment.
//! - [`SealedAmount`]: an opaque checked-`u64` handle standing in for an
//!   external MPC/FHE-backed amount. Arithmetic signals overflow explicitly
//!   instead of wrapping, exactly as an encrypted backend must.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Result, SettleError, constants::BPS_DENOMINATOR};

/// Checked arithmetic over an escrow amount, independent of encoding.
///
/// All operations are total: failures surface as [`SettleError::AmountOverflow`]
/// (or `InvalidInput` for out-of-range basis points), never as panics or
/// silent wrapping.
pub trait Amount:
    Clone
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + 'static
{
    /// The additive identity.
    fn zero() -> Self;

    /// Whether this amount is exactly zero.
    fn is_zero(&self) -> bool;

    /// `self + rhs`, or [`SettleError::AmountOverflow`].
    fn checked_add(&self, rhs: &Self) -> Result<Self>;

    /// `self - rhs`, or [`SettleError::AmountOverflow`] on underflow
    /// (amounts are unsigned).
    fn checked_sub(&self, rhs: &Self) -> Result<Self>;

    /// `floor(self * bps / 10_000)`, truncated toward zero at the amount's
    /// native precision. Rejects `bps > 10_000`.
    fn bps_share(&self, bps: u32) -> Result<Self>;

    /// Strict ordering test (`self < rhs`).
    fn less_than(&self, rhs: &Self) -> bool;
}

// ---------------------------------------------------------------------------
// PlainAmount
// ---------------------------------------------------------------------------

/// A plain decimal amount in the asset's native precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlainAmount(pub Decimal);

impl PlainAmount {
    #[must_use]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// The underlying decimal value.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for PlainAmount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<u64> for PlainAmount {
    fn from(value: u64) -> Self {
        Self(Decimal::from(value))
    }
}

impl fmt::Display for PlainAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Amount for PlainAmount {
    fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    fn checked_add(&self, rhs: &Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(SettleError::AmountOverflow)
    }

    fn checked_sub(&self, rhs: &Self) -> Result<Self> {
        if self.0 < rhs.0 {
            return Err(SettleError::AmountOverflow);
        }
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(SettleError::AmountOverflow)
    }

    fn bps_share(&self, bps: u32) -> Result<Self> {
        if bps > BPS_DENOMINATOR {
            return Err(SettleError::InvalidInput {
                reason: format!("bps {bps} exceeds denominator {BPS_DENOMINATOR}"),
            });
        }
        let raw = self
            .0
            .checked_mul(Decimal::from(bps))
            .and_then(|v| v.checked_div(Decimal::from(BPS_DENOMINATOR)))
            .ok_or(SettleError::AmountOverflow)?;
        // Truncate toward zero at the amount's own scale so shares never
        // gain precision the asset cannot represent.
        Ok(Self(raw.round_dp_with_strategy(
            self.0.scale(),
            RoundingStrategy::ToZero,
        )))
    }

    fn less_than(&self, rhs: &Self) -> bool {
        self.0 < rhs.0
    }
}

// ---------------------------------------------------------------------------
// SealedAmount
// ---------------------------------------------------------------------------

/// An opaque sealed amount handle.
///
/// Reference implementation of the sealed-amount interface: the value is held
/// as a private checked `u64` in the asset's smallest unit. A production
/// private-settlement deployment substitutes a handle whose arithmetic is
/// evaluated by an MPC or FHE backend; the engine only ever calls the
/// [`Amount`] operations, so swapping the backend touches nothing else.
///
/// `Display` and `Debug` never print the underlying value.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedAmount {
    inner: u64,
}

impl SealedAmount {
    /// Seal a raw value (smallest asset unit).
    #[must_use]
    pub fn seal(value: u64) -> Self {
        Self { inner: value }
    }

    /// Reveal the underlying value.
    ///
    /// Escape hatch for tests and for the host's decryption bridge; the
    /// engine itself never calls this.
    #[must_use]
    pub fn reveal(&self) -> u64 {
        self.inner
    }
}

impl fmt::Debug for SealedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedAmount(<sealed>)")
    }
}

impl fmt::Display for SealedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<sealed>")
    }
}

impl Amount for SealedAmount {
    fn zero() -> Self {
        Self::seal(0)
    }

    fn is_zero(&self) -> bool {
        self.inner == 0
    }

    fn checked_add(&self, rhs: &Self) -> Result<Self> {
        self.inner
            .checked_add(rhs.inner)
            .map(Self::seal)
            .ok_or(SettleError::AmountOverflow)
    }

    fn checked_sub(&self, rhs: &Self) -> Result<Self> {
        self.inner
            .checked_sub(rhs.inner)
            .map(Self::seal)
            .ok_or(SettleError::AmountOverflow)
    }

    fn bps_share(&self, bps: u32) -> Result<Self> {
        if bps > BPS_DENOMINATOR {
            return Err(SettleError::InvalidInput {
                reason: format!("bps {bps} exceeds denominator {BPS_DENOMINATOR}"),
            });
        }
        // Widen to u128: inner * bps cannot overflow there, and the result
        // fits back in u64 because bps <= 10_000.
        let share = u128::from(self.inner) * u128::from(bps) / u128::from(BPS_DENOMINATOR);
        u64::try_from(share)
            .map(Self::seal)
            .map_err(|_| SettleError::AmountOverflow)
    }

    fn less_than(&self, rhs: &Self) -> bool {
        self.inner < rhs.inner
    }
}
