//! The arbitrator registry.
//!
//! Storage is a single arena (indexed vector) of records plus an
//! account→slot index map. Removal is swap-with-last-and-truncate, with the
//! index map updated in the same operation — the arena and the map can never
//! go out of sync, and iteration during panel selection stays bounded by the
//! configured maximum.
//!
//! The one rule that matters most: an arbitrator seated on any dispute
//! (`assigned_disputes > 0`) can neither deregister nor withdraw stake.

use std::collections::HashMap;

use rust_decimal::Decimal;

use opensettle_types::{AccountId, ArbitratorRecord, Result, SettleError};

/// Bounded set of eligible arbitrators with their stakes.
#[derive(Debug, Clone)]
pub struct ArbitratorRegistry {
    /// The arena. Order is not meaningful and changes on removal.
    arena: Vec<ArbitratorRecord>,
    /// Account → arena slot.
    index: HashMap<AccountId, usize>,
    /// Maximum number of registered arbitrators.
    max_arbitrators: usize,
    /// Minimum stake to register and to remain after a partial withdrawal.
    min_stake: Decimal,
}

impl ArbitratorRegistry {
    #[must_use]
    pub fn new(max_arbitrators: usize, min_stake: Decimal) -> Self {
        Self {
            arena: Vec::new(),
            index: HashMap::new(),
            max_arbitrators,
            min_stake,
        }
    }

    /// Register a new arbitrator with its bonded stake.
    ///
    /// # Errors
    /// - `ArbitratorExists` if the account is already registered
    /// - `RegistryFull` at the configured maximum
    /// - `InsufficientStake` below the minimum stake
    pub fn register(&mut self, account: AccountId, stake: Decimal) -> Result<()> {
        if self.index.contains_key(&account) {
            return Err(SettleError::ArbitratorExists(account));
        }
        if self.arena.len() >= self.max_arbitrators {
            return Err(SettleError::RegistryFull {
                max: self.max_arbitrators,
            });
        }
        if stake < self.min_stake {
            return Err(SettleError::InsufficientStake {
                required: self.min_stake.to_string(),
                posted: stake.to_string(),
            });
        }
        self.index.insert(account, self.arena.len());
        self.arena.push(ArbitratorRecord::new(account, stake));
        tracing::info!(%account, %stake, "arbitrator registered");
        Ok(())
    }

    /// Remove an arbitrator entirely, returning the stake to pay out.
    ///
    /// # Errors
    /// - `ArbitratorNotFound` if not registered
    /// - `ArbitratorBusy` while seated on any dispute
    pub fn deregister(&mut self, account: AccountId) -> Result<Decimal> {
        let slot = *self
            .index
            .get(&account)
            .ok_or(SettleError::ArbitratorNotFound(account))?;
        let record = &self.arena[slot];
        if !record.can_release_stake() {
            return Err(SettleError::ArbitratorBusy {
                account,
                assigned: record.assigned_disputes,
            });
        }
        let removed = self.remove_slot(slot);
        tracing::info!(%account, "arbitrator deregistered");
        Ok(removed.stake)
    }

    /// Withdraw part or all of a stake. Withdrawing everything deregisters;
    /// a partial withdrawal must leave at least the minimum stake.
    ///
    /// # Errors
    /// - `ArbitratorNotFound` / `ArbitratorBusy` as for [`Self::deregister`]
    /// - `InsufficientBalance` if `amount` exceeds the stake
    /// - `InsufficientStake` if the remainder would fall below the minimum
    pub fn withdraw_stake(&mut self, account: AccountId, amount: Decimal) -> Result<Decimal> {
        let slot = *self
            .index
            .get(&account)
            .ok_or(SettleError::ArbitratorNotFound(account))?;
        let record = &self.arena[slot];
        if !record.can_release_stake() {
            return Err(SettleError::ArbitratorBusy {
                account,
                assigned: record.assigned_disputes,
            });
        }
        if record.stake < amount {
            return Err(SettleError::InsufficientBalance {
                needed: amount.to_string(),
                available: record.stake.to_string(),
            });
        }
        let remaining = record.stake - amount;
        if remaining.is_zero() {
            // Full exit.
            self.remove_slot(slot);
            tracing::info!(%account, "arbitrator fully exited");
        } else {
            if remaining < self.min_stake {
                return Err(SettleError::InsufficientStake {
                    required: self.min_stake.to_string(),
                    posted: remaining.to_string(),
                });
            }
            self.arena[slot].stake = remaining;
        }
        Ok(amount)
    }

    /// Top up an arbitrator's stake.
    pub fn add_stake(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        let slot = *self
            .index
            .get(&account)
            .ok_or(SettleError::ArbitratorNotFound(account))?;
        self.arena[slot].stake += amount;
        Ok(())
    }

    /// Toggle panel-selection availability.
    pub fn set_active(&mut self, account: AccountId, active: bool) -> Result<()> {
        let slot = *self
            .index
            .get(&account)
            .ok_or(SettleError::ArbitratorNotFound(account))?;
        self.arena[slot].active = active;
        Ok(())
    }

    /// Seat the given arbitrators on a dispute. Validates all accounts
    /// first, then increments every counter — never a partial update.
    pub fn mark_assigned(&mut self, accounts: &[AccountId]) -> Result<()> {
        let mut slots = Vec::with_capacity(accounts.len());
        for account in accounts {
            let slot = *self
                .index
                .get(account)
                .ok_or(SettleError::ArbitratorNotFound(*account))?;
            slots.push(slot);
        }
        for slot in slots {
            self.arena[slot].assigned_disputes += 1;
        }
        Ok(())
    }

    /// Release the given arbitrators from a finalized dispute.
    ///
    /// # Errors
    /// `Internal` if a counter would underflow — that means the engine's
    /// assignment bookkeeping is out of sync.
    pub fn release_assignment(&mut self, accounts: &[AccountId]) -> Result<()> {
        let mut slots = Vec::with_capacity(accounts.len());
        for account in accounts {
            let slot = *self
                .index
                .get(account)
                .ok_or(SettleError::ArbitratorNotFound(*account))?;
            if self.arena[slot].assigned_disputes == 0 {
                return Err(SettleError::Internal(format!(
                    "release_assignment for {account} with zero assigned disputes"
                )));
            }
            slots.push(slot);
        }
        for slot in slots {
            self.arena[slot].assigned_disputes -= 1;
        }
        Ok(())
    }

    /// Active arbitrators excluding the given accounts, sorted by account
    /// for deterministic downstream selection.
    #[must_use]
    pub fn selectable(&self, exclude: &[AccountId]) -> Vec<AccountId> {
        let mut out: Vec<AccountId> = self
            .arena
            .iter()
            .filter(|r| r.is_selectable() && !exclude.contains(&r.account))
            .map(|r| r.account)
            .collect();
        out.sort_unstable();
        out
    }

    /// Look up one record.
    #[must_use]
    pub fn get(&self, account: AccountId) -> Option<&ArbitratorRecord> {
        self.index.get(&account).map(|&slot| &self.arena[slot])
    }

    /// Number of registered arbitrators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Swap-remove `slot`, fixing the index entry of the record that moved
    /// into its place. One operation, never two separately-fallible steps.
    fn remove_slot(&mut self, slot: usize) -> ArbitratorRecord {
        let record = self.arena.swap_remove(slot);
        self.index.remove(&record.account);
        if let Some(moved) = self.arena.get(slot) {
            self.index.insert(moved.account, slot);
        }
        record
    }
}
