//! The escrow custody core.
//!
//! Owns every escrow record and its state machine, orchestrates fund
//! locking and pull-based disbursement through the [`Ledger`], and charges
//! fees through the shared splitter.
//!
//! ## Fee rule
//!
//! Fees are charged **if and only if funds move to the seller**; refunds to
//! the buyer are always free of the marketplace fee. Disputed resolutions
//! additionally pay an arbitration fee in **both** directions — arbitration
//! consumed real labor either way, and charging it symmetrically is the one
//! deliberate divergence from the undisputed path.
//!
//! ## Concurrency
//!
//! Single-writer-per-escrow: the record table is a read-locked map of
//! per-record mutexes. An operation holds its record's mutex for the whole
//! validate-then-commit sequence; operations on different escrows never
//! contend on a common lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use opensettle_ledger::{Clock, Ledger};
use opensettle_types::{
    AccountId, Amount, DisputeId, DisputeOutcome, Escrow, EscrowId, EscrowState, FeeDistribution,
    LockId, Result, SettleError, SettlementConfig, fees,
};

/// Result of a voluntary (undisputed) release.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome<A: Amount> {
    pub escrow_id: EscrowId,
    pub seller: AccountId,
    /// Credited claimable to the seller, net of the marketplace fee.
    pub seller_amount: A,
    pub marketplace_fees: FeeDistribution<A>,
}

/// Result of a voluntary or lazy-expiry refund.
#[derive(Debug, Clone)]
pub struct RefundOutcome<A: Amount> {
    pub escrow_id: EscrowId,
    pub buyer: AccountId,
    /// The full escrow amount; refunds are fee-free.
    pub amount: A,
}

/// What the dispute plane needs to open a dispute over an escrow.
#[derive(Debug, Clone)]
pub struct DisputeContext<A: Amount> {
    pub escrow_id: EscrowId,
    pub asset: String,
    pub raised_by: AccountId,
    pub respondent: AccountId,
    pub required_stake: A,
    pub stake_lock: LockId,
}

/// Result of applying an arbitration outcome to a disputed escrow.
#[derive(Debug, Clone)]
pub struct ArbitratedOutcome<A: Amount> {
    pub escrow_id: EscrowId,
    pub final_state: EscrowState,
    pub paid_to: AccountId,
    /// Credited claimable to `paid_to`, net of all fees.
    pub paid_amount: A,
    /// Present only when funds moved to the seller.
    pub marketplace_fees: Option<FeeDistribution<A>>,
    /// Charged identically for both outcome directions.
    pub arbitration_fees: FeeDistribution<A>,
}

/// Owns escrow records, their state machines, and fund custody.
pub struct EscrowLedger<A: Amount, L: Ledger<A>, C: Clock> {
    escrows: RwLock<HashMap<EscrowId, Arc<Mutex<Escrow<A>>>>>,
    next_id: AtomicU64,
    ledger: Arc<L>,
    clock: Arc<C>,
    config: SettlementConfig<A>,
}

impl<A: Amount, L: Ledger<A>, C: Clock> EscrowLedger<A, L, C> {
    pub fn new(config: SettlementConfig<A>, ledger: Arc<L>, clock: Arc<C>) -> Self {
        Self {
            escrows: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            ledger,
            clock,
            config,
        }
    }

    /// Create an escrow and lock the buyer's funds, atomically.
    ///
    /// The ledger lock happens after all validation and before record
    /// insertion; insertion is infallible, so either both effects occur or
    /// neither does.
    ///
    /// # Errors
    /// - `InvalidInput` for a zero amount or a too-short duration
    /// - `SelfDealing` if buyer == seller
    /// - `AmountBelowMinimum` under the configured dust floor
    /// - `InsufficientBalance` if the buyer cannot fund the lock
    pub fn create_escrow(
        &self,
        buyer: AccountId,
        seller: AccountId,
        asset: &str,
        amount: A,
        duration: chrono::Duration,
    ) -> Result<Escrow<A>> {
        if amount.is_zero() {
            return Err(SettleError::InvalidInput {
                reason: "escrow amount must be non-zero".to_string(),
            });
        }
        if buyer == seller {
            return Err(SettleError::SelfDealing);
        }
        if amount.less_than(&self.config.min_escrow_amount) {
            return Err(SettleError::AmountBelowMinimum {
                amount: amount.to_string(),
                minimum: self.config.min_escrow_amount.to_string(),
            });
        }
        if duration < self.config.min_escrow_duration() {
            return Err(SettleError::InvalidInput {
                reason: format!(
                    "duration {}s below minimum {}s",
                    duration.num_seconds(),
                    self.config.min_escrow_duration_secs
                ),
            });
        }

        let lock_id = self.ledger.lock(buyer, asset, &amount)?;
        let now = self.clock.now();
        let id = EscrowId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let escrow = Escrow {
            id,
            buyer,
            seller,
            asset: asset.to_string(),
            amount,
            lock_id,
            created_at: now,
            expires_at: now + duration,
            state: EscrowState::Open,
            dispute_id: None,
        };
        self.escrows
            .write()
            .insert(id, Arc::new(Mutex::new(escrow.clone())));
        tracing::info!(escrow = %id, %buyer, %seller, asset, "escrow created");
        Ok(escrow)
    }

    /// Snapshot of one escrow record.
    pub fn get(&self, id: EscrowId) -> Result<Escrow<A>> {
        let handle = self.handle(id)?;
        let escrow = handle.lock();
        Ok(escrow.clone())
    }

    /// Buyer-only voluntary release to the seller. Marketplace fee is
    /// charged on this path — the only undisputed path where funds move to
    /// the seller.
    pub fn release_funds(&self, id: EscrowId, caller: AccountId) -> Result<ReleaseOutcome<A>> {
        let now = self.clock.now();
        self.with_escrow(id, |escrow| {
            if escrow.is_resolved() {
                return Err(SettleError::AlreadyResolved(id));
            }
            if caller != escrow.buyer {
                return Err(SettleError::not_authorized(format!(
                    "only the buyer may release {id}"
                )));
            }
            if escrow.state != EscrowState::Open {
                return Err(SettleError::invalid_state(format!(
                    "cannot release {id} in {}",
                    escrow.state
                )));
            }
            if now > escrow.expires_at {
                return Err(SettleError::Expired(id));
            }

            let fee = fees::fee_of(&escrow.amount, self.config.marketplace_fee_bps)?;
            let seller_amount = escrow.amount.checked_sub(&fee)?;
            let marketplace_fees = fees::split(&fee, &self.config.marketplace_shares)?;

            if !seller_amount.is_zero() {
                self.ledger
                    .transfer_from_lock(escrow.lock_id, escrow.seller, &seller_amount)?;
            }
            for (recipient, value) in marketplace_fees.nonzero_shares() {
                self.ledger
                    .transfer_from_lock(escrow.lock_id, *recipient, value)?;
            }
            escrow.transition(EscrowState::Released)?;
            tracing::info!(escrow = %id, "released to seller");
            Ok(ReleaseOutcome {
                escrow_id: id,
                seller: escrow.seller,
                seller_amount,
                marketplace_fees,
            })
        })
    }

    /// Refund the full amount to the buyer, fee-free. The seller may do
    /// this voluntarily at any time; after expiry anyone may trigger it.
    pub fn refund_buyer(&self, id: EscrowId, caller: AccountId) -> Result<RefundOutcome<A>> {
        let now = self.clock.now();
        self.with_escrow(id, |escrow| {
            if escrow.is_resolved() {
                return Err(SettleError::AlreadyResolved(id));
            }
            if caller != escrow.seller && now <= escrow.expires_at {
                return Err(SettleError::NotYetExpired(id));
            }
            if escrow.state != EscrowState::Open {
                return Err(SettleError::invalid_state(format!(
                    "cannot refund {id} in {}",
                    escrow.state
                )));
            }

            self.ledger
                .transfer_from_lock(escrow.lock_id, escrow.buyer, &escrow.amount)?;
            escrow.transition(EscrowState::Refunded)?;
            tracing::info!(escrow = %id, "refunded to buyer");
            Ok(RefundOutcome {
                escrow_id: id,
                buyer: escrow.buyer,
                amount: escrow.amount.clone(),
            })
        })
    }

    /// Move an escrow into `DISPUTED`, locking the disputer's stake.
    ///
    /// This is the **only** entry point that transitions to `DISPUTED`; no
    /// vote or release path may cause that transition implicitly. Each
    /// escrow gets at most one dispute for its whole lifetime.
    pub fn begin_dispute(&self, id: EscrowId, caller: AccountId) -> Result<DisputeContext<A>> {
        let now = self.clock.now();
        self.with_escrow(id, |escrow| {
            if escrow.is_resolved() {
                return Err(SettleError::AlreadyResolved(id));
            }
            if !escrow.is_participant(caller) {
                return Err(SettleError::not_authorized(format!(
                    "only a participant may dispute {id}"
                )));
            }
            if escrow.state == EscrowState::Disputed || escrow.dispute_id.is_some() {
                return Err(SettleError::AlreadyDisputed(id));
            }
            if now > escrow.expires_at {
                return Err(SettleError::Expired(id));
            }

            let required_stake = fees::fee_of(&escrow.amount, self.config.dispute_stake_bps)?;
            let stake_lock = self.ledger.lock(caller, &escrow.asset, &required_stake)?;
            escrow.transition(EscrowState::Disputed)?;
            let respondent = escrow.counterparty_of(caller)?;
            tracing::info!(escrow = %id, raised_by = %caller, "dispute begun");
            Ok(DisputeContext {
                escrow_id: id,
                asset: escrow.asset.clone(),
                raised_by: caller,
                respondent,
                required_stake,
                stake_lock,
            })
        })
    }

    /// Record the back-reference to the dispute created for this escrow.
    pub fn attach_dispute(&self, id: EscrowId, dispute_id: DisputeId) -> Result<()> {
        self.with_escrow(id, |escrow| {
            if escrow.dispute_id.is_some() {
                return Err(SettleError::Internal(format!(
                    "{id} already has a dispute attached"
                )));
            }
            escrow.dispute_id = Some(dispute_id);
            Ok(())
        })
    }

    /// Apply a finalized arbitration outcome to a disputed escrow.
    ///
    /// Invoked only by the coordinator when the dispute plane reports an
    /// outcome — never directly by a user. The arbitration fee is deducted
    /// identically for both directions; the marketplace fee applies only
    /// when funds move to the seller.
    pub fn apply_dispute_outcome(
        &self,
        id: EscrowId,
        outcome: DisputeOutcome,
    ) -> Result<ArbitratedOutcome<A>> {
        self.with_escrow(id, |escrow| {
            if escrow.is_resolved() {
                return Err(SettleError::AlreadyResolved(id));
            }
            if escrow.state != EscrowState::Disputed {
                return Err(SettleError::invalid_state(format!(
                    "cannot apply dispute outcome to {id} in {}",
                    escrow.state
                )));
            }

            let (paid_to, final_state) = match outcome {
                DisputeOutcome::Release => (escrow.seller, EscrowState::Released),
                DisputeOutcome::Refund => (escrow.buyer, EscrowState::Refunded),
                DisputeOutcome::Defaulted { favored } => {
                    if !escrow.is_participant(favored) {
                        return Err(SettleError::Internal(format!(
                            "default outcome favors non-participant {favored}"
                        )));
                    }
                    (favored, EscrowState::Defaulted)
                }
                DisputeOutcome::Pending => {
                    return Err(SettleError::invalid_state(format!(
                        "cannot apply pending outcome to {id}"
                    )));
                }
            };
            let to_seller = paid_to == escrow.seller;

            let arbitration_fee =
                fees::fee_of(&escrow.amount, self.config.arbitration_fee_bps)?;
            let marketplace_fee = if to_seller {
                fees::fee_of(&escrow.amount, self.config.marketplace_fee_bps)?
            } else {
                A::zero()
            };
            let paid_amount = escrow
                .amount
                .checked_sub(&arbitration_fee)?
                .checked_sub(&marketplace_fee)?;

            let arbitration_fees = fees::split(&arbitration_fee, &self.config.arbitration_shares)?;
            let marketplace_fees = if to_seller {
                Some(fees::split(
                    &marketplace_fee,
                    &self.config.marketplace_shares,
                )?)
            } else {
                None
            };

            if !paid_amount.is_zero() {
                self.ledger
                    .transfer_from_lock(escrow.lock_id, paid_to, &paid_amount)?;
            }
            for (recipient, value) in arbitration_fees.nonzero_shares() {
                self.ledger
                    .transfer_from_lock(escrow.lock_id, *recipient, value)?;
            }
            if let Some(dist) = &marketplace_fees {
                for (recipient, value) in dist.nonzero_shares() {
                    self.ledger
                        .transfer_from_lock(escrow.lock_id, *recipient, value)?;
                }
            }
            escrow.transition(final_state)?;
            tracing::info!(escrow = %id, %outcome, state = %final_state, "dispute outcome applied");
            Ok(ArbitratedOutcome {
                escrow_id: id,
                final_state,
                paid_to,
                paid_amount,
                marketplace_fees,
                arbitration_fees,
            })
        })
    }

    /// Number of escrows ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.escrows.read().len()
    }

    /// Whether no escrow was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.escrows.read().is_empty()
    }

    fn handle(&self, id: EscrowId) -> Result<Arc<Mutex<Escrow<A>>>> {
        self.escrows
            .read()
            .get(&id)
            .cloned()
            .ok_or(SettleError::EscrowNotFound(id))
    }

    /// Run `f` holding the record's mutex: the whole validate-then-commit
    /// sequence is serialized per escrow.
    fn with_escrow<T>(&self, id: EscrowId, f: impl FnOnce(&mut Escrow<A>) -> Result<T>) -> Result<T> {
        let handle = self.handle(id)?;
        let mut escrow = handle.lock();
        f(&mut escrow)
    }
}
