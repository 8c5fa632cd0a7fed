//! In-memory reference ledger.
//!
//! Implements [`Ledger`] for hosts and tests: per-(asset, account) available
//! and claimable balances, custody locks, and an integrated supply
//! conservation tracker. All state sits behind one mutex; every operation is
//! atomic — it either fully applies or leaves the ledger untouched
//! (validation happens before the first mutation).

use std::collections::HashMap;

use parking_lot::Mutex;

use opensettle_types::{AccountId, Amount, Asset, LockId, Result, SettleError};

use crate::{Ledger, SupplyConservation};

/// One custody lock: funds debited from the owner, not yet disbursed.
#[derive(Debug, Clone)]
struct LockState<A> {
    owner: AccountId,
    asset: Asset,
    remaining: A,
}

#[derive(Debug)]
struct Inner<A: Amount> {
    /// Per-(asset, account) spendable balances.
    available: HashMap<(Asset, AccountId), A>,
    /// Per-(asset, account) pull-claimable balances.
    claimable: HashMap<(Asset, AccountId), A>,
    /// Outstanding custody locks. Fully drained locks are removed.
    locks: HashMap<LockId, LockState<A>>,
    /// Deposits-minus-withdrawals bookkeeping for the audit path.
    conservation: SupplyConservation<A>,
}

/// In-memory [`Ledger`] implementation.
#[derive(Debug)]
pub struct InMemoryLedger<A: Amount> {
    inner: Mutex<Inner<A>>,
}

impl<A: Amount> InMemoryLedger<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                available: HashMap::new(),
                claimable: HashMap::new(),
                locks: HashMap::new(),
                conservation: SupplyConservation::new(),
            }),
        }
    }

    /// Deposit external funds into an account's available balance.
    pub fn deposit(&self, account: AccountId, asset: &str, amount: &A) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.conservation.record_deposit(asset, amount)?;
        let entry = inner
            .available
            .entry((asset.to_string(), account))
            .or_insert_with(A::zero);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    /// Withdraw funds from an account's available balance out of custody.
    pub fn withdraw(&self, account: AccountId, asset: &str, amount: &A) -> Result<()> {
        let mut inner = self.inner.lock();
        let key = (asset.to_string(), account);
        let available = inner.available.get(&key).cloned().unwrap_or_else(A::zero);
        if available.less_than(amount) {
            return Err(SettleError::InsufficientBalance {
                needed: amount.to_string(),
                available: available.to_string(),
            });
        }
        let remaining = available.checked_sub(amount)?;
        inner.available.insert(key, remaining);
        inner.conservation.record_withdrawal(asset, amount)?;
        Ok(())
    }

    /// Verify supply conservation for `asset`: the sum of all available,
    /// claimable, and locked balances must equal deposits minus withdrawals.
    pub fn audit(&self, asset: &str) -> Result<()> {
        let inner = self.inner.lock();
        let mut actual = A::zero();
        for ((a, _), value) in &inner.available {
            if a == asset {
                actual = actual.checked_add(value)?;
            }
        }
        for ((a, _), value) in &inner.claimable {
            if a == asset {
                actual = actual.checked_add(value)?;
            }
        }
        for lock in inner.locks.values() {
            if lock.asset == asset {
                actual = actual.checked_add(&lock.remaining)?;
            }
        }
        inner.conservation.verify(asset, &actual)
    }

    /// Number of outstanding custody locks.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.inner.lock().locks.len()
    }
}

impl<A: Amount> Default for InMemoryLedger<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Amount> Ledger<A> for InMemoryLedger<A> {
    fn lock(&self, from: AccountId, asset: &str, amount: &A) -> Result<LockId> {
        let mut inner = self.inner.lock();
        let key = (asset.to_string(), from);
        // A zero-amount lock (e.g. a zero-bps stake) must succeed even for
        // an account the ledger has never seen.
        let available = inner.available.get(&key).cloned().unwrap_or_else(A::zero);
        if available.less_than(amount) {
            return Err(SettleError::InsufficientBalance {
                needed: amount.to_string(),
                available: available.to_string(),
            });
        }
        let remaining = available.checked_sub(amount)?;
        inner.available.insert(key, remaining);

        let lock_id = LockId::new();
        inner.locks.insert(
            lock_id,
            LockState {
                owner: from,
                asset: asset.to_string(),
                remaining: amount.clone(),
            },
        );
        tracing::debug!(%lock_id, %from, asset, "funds locked");
        Ok(lock_id)
    }

    fn transfer_from_lock(&self, lock_id: LockId, to: AccountId, amount: &A) -> Result<()> {
        let mut inner = self.inner.lock();
        let lock = inner
            .locks
            .get(&lock_id)
            .ok_or(SettleError::LockNotFound(lock_id))?;
        if lock.remaining.less_than(amount) {
            return Err(SettleError::InsufficientBalance {
                needed: amount.to_string(),
                available: lock.remaining.to_string(),
            });
        }
        let asset = lock.asset.clone();
        let remaining = lock.remaining.checked_sub(amount)?;

        let entry = inner
            .claimable
            .entry((asset, to))
            .or_insert_with(A::zero);
        *entry = entry.checked_add(amount)?;

        if remaining.is_zero() {
            inner.locks.remove(&lock_id);
        } else if let Some(lock) = inner.locks.get_mut(&lock_id) {
            lock.remaining = remaining;
        }
        tracing::debug!(%lock_id, %to, "lock disbursed to claimable");
        Ok(())
    }

    fn release_lock(&self, lock_id: LockId) -> Result<A> {
        let mut inner = self.inner.lock();
        let lock = inner
            .locks
            .remove(&lock_id)
            .ok_or(SettleError::LockNotFound(lock_id))?;
        let entry = inner
            .available
            .entry((lock.asset, lock.owner))
            .or_insert_with(A::zero);
        *entry = entry.checked_add(&lock.remaining)?;
        tracing::debug!(%lock_id, owner = %lock.owner, "lock released to owner");
        Ok(lock.remaining)
    }

    fn credit_claimable(&self, asset: &str, account: AccountId, amount: &A) -> Result<()> {
        let mut inner = self.inner.lock();
        // External funds entering custody count as a deposit for the audit.
        inner.conservation.record_deposit(asset, amount)?;
        let entry = inner
            .claimable
            .entry((asset.to_string(), account))
            .or_insert_with(A::zero);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    fn claim(&self, asset: &str, account: AccountId) -> Result<A> {
        let mut inner = self.inner.lock();
        let Some(amount) = inner.claimable.remove(&(asset.to_string(), account)) else {
            return Ok(A::zero());
        };
        let entry = inner
            .available
            .entry((asset.to_string(), account))
            .or_insert_with(A::zero);
        *entry = entry.checked_add(&amount)?;
        tracing::debug!(%account, asset, "claimable drained");
        Ok(amount)
    }

    fn balance_of(&self, asset: &str, account: AccountId) -> A {
        self.inner
            .lock()
            .available
            .get(&(asset.to_string(), account))
            .cloned()
            .unwrap_or_else(A::zero)
    }

    fn claimable_of(&self, asset: &str, account: AccountId) -> A {
        self.inner
            .lock()
            .claimable
            .get(&(asset.to_string(), account))
            .cloned()
            .unwrap_or_else(A::zero)
    }

    fn locked_remaining(&self, lock_id: LockId) -> Result<A> {
        self.inner
            .lock()
            .locks
            .get(&lock_id)
            .map(|l| l.remaining.clone())
            .ok_or(SettleError::LockNotFound(lock_id))
    }
}
