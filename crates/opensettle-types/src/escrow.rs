//! # Escrow — the bilateral conditional-payment record
//!
//! An `Escrow` holds a buyer's funds under custody until they are released
//! to the seller, refunded to the buyer, or routed through arbitration.
//!
//! ## State Machine
//!
//! ```text
//!              ┌──────────┐
//!    ┌────────▶│ RELEASED │
//!    │         └──────────┘
//! ┌──┴───┐     ┌──────────┐
//! │ OPEN ├────▶│ REFUNDED │
//! └──┬───┘     └──────────┘
//!    │ raise_dispute
//!    ▼
//! ┌──────────┐  outcome   ┌─────────────────────────────────┐
//! │ DISPUTED ├───────────▶│ RELEASED | REFUNDED | DEFAULTED │
//! └──────────┘            └─────────────────────────────────┘
//! ```
//!
//! All right-hand states are terminal. Nothing ever leaves DISPUTED except
//! a dispute outcome, and nothing re-enters OPEN.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, Asset, DisputeId, EscrowId, LockId, Result, SettleError};

/// The lifecycle state of an escrow.
///
/// Transitions are **monotonic** (never go backwards):
/// - `Open → Released` (buyer voluntarily released)
/// - `Open → Refunded` (seller refunded, or lazy expiry)
/// - `Open → Disputed` (a participant raised the single lifetime dispute)
/// - `Disputed → Released | Refunded | Defaulted` (arbitration outcome)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    /// Funds are locked; either party can still act voluntarily.
    Open,
    /// A dispute is pending. Only a dispute outcome can move the record.
    Disputed,
    /// Funds went to the seller (minus fees). **Irreversible.**
    Released,
    /// Funds went back to the buyer. **Irreversible.**
    Refunded,
    /// The dispute defaulted (deadline, no quorum) and was resolved by
    /// stake policy. **Irreversible.**
    Defaulted,
}

impl EscrowState {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded | Self::Defaulted)
    }

    /// Can this escrow transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Open,
                Self::Released | Self::Refunded | Self::Disputed
            ) | (
                Self::Disputed,
                Self::Released | Self::Refunded | Self::Defaulted
            )
        )
    }
}

impl std::fmt::Display for EscrowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Defaulted => write!(f, "DEFAULTED"),
        }
    }
}

/// One bilateral conditional-payment agreement.
///
/// The record is generic over the amount encoding: a plain public escrow and
/// a sealed private escrow run the identical state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Escrow<A: Amount> {
    /// Monotonic identifier, assigned at creation.
    pub id: EscrowId,
    /// The party whose funds are under custody.
    pub buyer: AccountId,
    /// The party funds are released to on success.
    pub seller: AccountId,
    /// Asset under custody.
    pub asset: Asset,
    /// Amount under custody. Zeroed semantics are carried by the terminal
    /// state, not by mutating this field.
    pub amount: A,
    /// Custody lock in the ledger collaborator.
    pub lock_id: LockId,
    /// When the escrow was created.
    pub created_at: DateTime<Utc>,
    /// After this instant, anyone may trigger the lazy-expiry refund.
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: EscrowState,
    /// The single lifetime dispute, if one was ever raised.
    pub dispute_id: Option<DisputeId>,
}

impl<A: Amount> Escrow<A> {
    /// Whether the escrow has reached a terminal state.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether `account` is the buyer or the seller.
    #[must_use]
    pub fn is_participant(&self, account: AccountId) -> bool {
        account == self.buyer || account == self.seller
    }

    /// The other participant.
    ///
    /// # Errors
    /// Returns `NotAuthorized` if `account` is not a participant.
    pub fn counterparty_of(&self, account: AccountId) -> Result<AccountId> {
        if account == self.buyer {
            Ok(self.seller)
        } else if account == self.seller {
            Ok(self.buyer)
        } else {
            Err(SettleError::not_authorized(format!(
                "{account} is not a participant in {}",
                self.id
            )))
        }
    }

    /// Attempt a state transition, enforcing the machine's legality rules.
    ///
    /// # Errors
    /// - `AlreadyResolved` if the escrow is already terminal
    /// - `InvalidState` for any other illegal transition
    pub fn transition(&mut self, target: EscrowState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(SettleError::AlreadyResolved(self.id));
        }
        if !self.state.can_transition_to(target) {
            return Err(SettleError::invalid_state(format!(
                "cannot transition {} from {} to {target}",
                self.id, self.state
            )));
        }
        self.state = target;
        Ok(())
    }
}
