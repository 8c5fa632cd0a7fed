//! The abstract atomic value-transfer collaborator.
//!
//! The settlement engine never mutates balances directly; every debit and
//! credit against the custodied pool goes through this interface, and each
//! call either fully succeeds or fully fails. Disbursement is **pull-based**:
//! `transfer_from_lock` credits the recipient's *claimable* balance, and a
//! separate [`Ledger::claim`] moves claimable funds into the recipient's
//! available balance at the recipient's own initiative. A blacklisted or
//! reverting recipient can therefore never block anyone else's resolution.

use opensettle_types::{AccountId, Amount, LockId, Result};

/// Atomic value transfer and balance queries over named asset accounts.
///
/// Implementations take `&self` and serialize internally; the engine may
/// call from multiple per-escrow operations concurrently.
pub trait Ledger<A: Amount>: Send + Sync {
    /// Move `amount` of `asset` from `from`'s available balance into a new
    /// custody lock. All-or-nothing.
    ///
    /// # Errors
    /// `InsufficientBalance` if `from` cannot cover `amount`.
    fn lock(&self, from: AccountId, asset: &str, amount: &A) -> Result<LockId>;

    /// Move `amount` out of a custody lock into `to`'s **claimable**
    /// balance. A fully drained lock ceases to exist.
    ///
    /// # Errors
    /// - `LockNotFound` if the lock does not exist
    /// - `InsufficientBalance` if the lock holds less than `amount`
    fn transfer_from_lock(&self, lock_id: LockId, to: AccountId, amount: &A) -> Result<()>;

    /// Dissolve a lock, returning its remaining balance to the lock owner's
    /// available balance. Returns the released amount.
    ///
    /// # Errors
    /// `LockNotFound` if the lock does not exist.
    fn release_lock(&self, lock_id: LockId) -> Result<A>;

    /// Credit `account`'s claimable balance directly (funds entering
    /// custody from outside the engine).
    fn credit_claimable(&self, asset: &str, account: AccountId, amount: &A) -> Result<()>;

    /// Drain `account`'s claimable balance into its available balance.
    /// Idempotent: returns the drained amount, `zero` when nothing was
    /// claimable — never an error.
    fn claim(&self, asset: &str, account: AccountId) -> Result<A>;

    /// `account`'s available balance (zero if the account is unknown).
    fn balance_of(&self, asset: &str, account: AccountId) -> A;

    /// `account`'s claimable balance (zero if the account is unknown).
    fn claimable_of(&self, asset: &str, account: AccountId) -> A;

    /// Remaining balance held by a lock.
    ///
    /// # Errors
    /// `LockNotFound` if the lock does not exist (or was fully drained).
    fn locked_remaining(&self, lock_id: LockId) -> Result<A>;
}
