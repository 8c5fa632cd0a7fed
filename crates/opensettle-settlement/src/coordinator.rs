//! The settlement coordinator — the only surface external callers touch.
//!
//! Routes to the escrow custody core, the dispute resolver, and the
//! arbitrator registry; enforces authorization and timing; optionally gates
//! dispute-raising on an external identity registry; and emits exactly one
//! [`SettlementEvent`] per state transition and per fund movement,
//! mirrored to `tracing`.
//!
//! Lock order, where multiple are held: resolver → registry → events.
//! Escrow record mutexes live inside the custody core and are never held
//! across a resolver call.

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use opensettle_arbitration::{
    ArbitratorRegistry, DisputeOpening, DisputeResolver, EntropySource, OsEntropy,
};
use opensettle_ledger::{Clock, Ledger};
use opensettle_types::{
    AccountId, Amount, ArbitratorRecord, Dispute, DisputeId, DisputeOutcome, Escrow, EscrowId,
    FeeDistribution, FeeKind, Result, SequencedEvent, SettleError, SettlementConfig,
    SettlementEvent, VoteChoice, fees,
};

use crate::escrow_ledger::EscrowLedger;
use crate::identity::IdentityRegistry;

/// Top-level entry point for the settlement engine.
pub struct SettlementCoordinator<A: Amount, L: Ledger<A>, C: Clock> {
    config: SettlementConfig<A>,
    ledger: Arc<L>,
    clock: Arc<C>,
    escrows: EscrowLedger<A, L, C>,
    resolver: Mutex<DisputeResolver<A>>,
    registry: Mutex<ArbitratorRegistry>,
    entropy: Box<dyn EntropySource>,
    identity: Option<Box<dyn IdentityRegistry>>,
    events: Mutex<EventLog<A>>,
}

impl<A: Amount, L: Ledger<A>, C: Clock> std::fmt::Debug for SettlementCoordinator<A, L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementCoordinator")
            .finish_non_exhaustive()
    }
}

struct EventLog<A: Amount> {
    next_seq: u64,
    entries: Vec<SequencedEvent<A>>,
}

impl<A: Amount, L: Ledger<A>, C: Clock> SettlementCoordinator<A, L, C> {
    /// Build a coordinator over the given collaborators.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration fails validation.
    pub fn new(config: SettlementConfig<A>, ledger: Arc<L>, clock: Arc<C>) -> Result<Self> {
        config.validate()?;
        let registry =
            ArbitratorRegistry::new(config.max_arbitrators, config.min_arbitrator_stake);
        Ok(Self {
            escrows: EscrowLedger::new(config.clone(), Arc::clone(&ledger), Arc::clone(&clock)),
            resolver: Mutex::new(DisputeResolver::new()),
            registry: Mutex::new(registry),
            entropy: Box::new(OsEntropy),
            identity: None,
            events: Mutex::new(EventLog {
                next_seq: 0,
                entries: Vec::new(),
            }),
            config,
            ledger,
            clock,
        })
    }

    /// Replace the selection-time entropy source (tests, external beacons).
    #[must_use]
    pub fn with_entropy_source(mut self, entropy: Box<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Gate dispute-raising on an external identity registry.
    #[must_use]
    pub fn with_identity_registry(mut self, identity: Box<dyn IdentityRegistry>) -> Self {
        self.identity = Some(identity);
        self
    }

    // =================================================================
    // Escrow lifecycle
    // =================================================================

    /// Create an escrow, locking the buyer's funds.
    pub fn create_escrow(
        &self,
        buyer: AccountId,
        seller: AccountId,
        asset: &str,
        amount: A,
        duration: chrono::Duration,
    ) -> Result<EscrowId> {
        let escrow = self
            .escrows
            .create_escrow(buyer, seller, asset, amount, duration)?;
        self.emit(SettlementEvent::EscrowCreated {
            escrow_id: escrow.id,
            buyer,
            seller,
            asset: escrow.asset.clone(),
            amount: escrow.amount.clone(),
            expires_at: escrow.expires_at,
        });
        Ok(escrow.id)
    }

    /// Buyer-only voluntary release to the seller.
    pub fn release_funds(&self, escrow_id: EscrowId, caller: AccountId) -> Result<()> {
        let outcome = self.escrows.release_funds(escrow_id, caller)?;
        self.emit(SettlementEvent::EscrowReleased {
            escrow_id,
            seller: outcome.seller,
            amount: outcome.seller_amount,
        });
        self.emit_fees(escrow_id, FeeKind::Marketplace, &outcome.marketplace_fees);
        Ok(())
    }

    /// Fee-free refund: seller voluntarily, or anyone after expiry.
    pub fn refund_buyer(&self, escrow_id: EscrowId, caller: AccountId) -> Result<()> {
        let outcome = self.escrows.refund_buyer(escrow_id, caller)?;
        self.emit(SettlementEvent::EscrowRefunded {
            escrow_id,
            buyer: outcome.buyer,
            amount: outcome.amount,
        });
        Ok(())
    }

    // =================================================================
    // Dispute lifecycle
    // =================================================================

    /// Raise the escrow's single lifetime dispute, posting the disputer's
    /// stake and committing to a panel-selection seed.
    pub fn raise_dispute(
        &self,
        escrow_id: EscrowId,
        caller: AccountId,
        committed_hash: [u8; 32],
    ) -> Result<DisputeId> {
        if let Some(identity) = &self.identity {
            if !identity.is_registered(caller) {
                return Err(SettleError::NotRegistered(caller));
            }
        }
        let ctx = self.escrows.begin_dispute(escrow_id, caller)?;
        let dispute_id = self.resolver.lock().open(
            DisputeOpening {
                escrow_id: ctx.escrow_id,
                asset: ctx.asset,
                raised_by: ctx.raised_by,
                respondent: ctx.respondent,
                committed_hash,
                required_stake: ctx.required_stake.clone(),
                disputer_stake_lock: ctx.stake_lock,
            },
            self.clock.now(),
            self.config.counter_stake_window(),
        );
        self.escrows.attach_dispute(escrow_id, dispute_id)?;
        self.emit(SettlementEvent::DisputeRaised {
            escrow_id,
            dispute_id,
            raised_by: caller,
            stake: ctx.required_stake,
        });
        Ok(dispute_id)
    }

    /// Post the respondent's matching counter-stake.
    pub fn post_counter_stake(
        &self,
        dispute_id: DisputeId,
        caller: AccountId,
        amount: &A,
    ) -> Result<()> {
        let now = self.clock.now();
        let mut resolver = self.resolver.lock();
        resolver.check_counter_stake(dispute_id, caller, amount, now)?;
        let asset = resolver.get(dispute_id)?.asset.clone();
        let lock = self.ledger.lock(caller, &asset, amount)?;
        resolver.record_counter_stake(dispute_id, lock)?;
        drop(resolver);
        self.emit(SettlementEvent::CounterStakePosted {
            dispute_id,
            respondent: caller,
            stake: amount.clone(),
        });
        Ok(())
    }

    /// Reveal the committed seed and draw the arbitrator panel.
    pub fn reveal_dispute(
        &self,
        dispute_id: DisputeId,
        caller: AccountId,
        seed: &[u8; 32],
    ) -> Result<Vec<AccountId>> {
        let now = self.clock.now();
        let entropy = self.entropy.draw();
        let mut resolver = self.resolver.lock();
        let mut registry = self.registry.lock();
        let panel = resolver.reveal_and_select_panel(
            dispute_id,
            caller,
            seed,
            &mut registry,
            self.config.panel_size,
            &entropy,
            self.config.voting_window(),
            now,
        )?;
        let voting_deadline = resolver
            .get(dispute_id)?
            .voting_deadline
            .ok_or_else(|| SettleError::Internal("panel selected without deadline".into()))?;
        drop(registry);
        drop(resolver);
        self.emit(SettlementEvent::PanelSelected {
            dispute_id,
            panel: panel.clone(),
            voting_deadline,
        });
        Ok(panel)
    }

    /// Cast a panel member's vote. If this vote reaches quorum, the outcome
    /// is applied to the escrow and all stakes settle.
    pub fn cast_vote(
        &self,
        dispute_id: DisputeId,
        arbitrator: AccountId,
        choice: VoteChoice,
    ) -> Result<Option<DisputeOutcome>> {
        let now = self.clock.now();
        let (decided, dispute) = {
            let mut resolver = self.resolver.lock();
            let mut registry = self.registry.lock();
            let decided =
                resolver.cast_vote(dispute_id, arbitrator, choice, now, &mut registry)?;
            let dispute = resolver.get(dispute_id)?.clone();
            (decided, dispute)
        };
        self.emit(SettlementEvent::VoteCast {
            dispute_id,
            arbitrator,
            choice,
        });
        if let Some(outcome) = decided {
            self.emit(SettlementEvent::DisputeResolved {
                dispute_id,
                escrow_id: dispute.escrow_id,
                outcome,
            });
            self.apply_outcome(&dispute, outcome)?;
        }
        Ok(decided)
    }

    /// Resolve a dispute whose deadline passed without progress. Callable
    /// by anyone.
    pub fn trigger_default_resolution(&self, dispute_id: DisputeId) -> Result<()> {
        let now = self.clock.now();
        let (favored, dispute) = {
            let mut resolver = self.resolver.lock();
            let mut registry = self.registry.lock();
            let favored = resolver.trigger_default(
                dispute_id,
                now,
                self.config.voting_window(),
                &mut registry,
            )?;
            let dispute = resolver.get(dispute_id)?.clone();
            (favored, dispute)
        };
        self.emit(SettlementEvent::DisputeDefaulted {
            dispute_id,
            escrow_id: dispute.escrow_id,
            favored,
        });
        self.apply_outcome(&dispute, DisputeOutcome::Defaulted { favored })?;
        Ok(())
    }

    // =================================================================
    // Claims
    // =================================================================

    /// Drain the caller's claimable balance. Idempotent: returns zero when
    /// nothing is claimable.
    pub fn claim(&self, asset: &str, account: AccountId) -> Result<A> {
        let amount = self.ledger.claim(asset, account)?;
        if !amount.is_zero() {
            self.emit(SettlementEvent::FundsClaimed {
                asset: asset.to_string(),
                account,
                amount: amount.clone(),
            });
        }
        Ok(amount)
    }

    // =================================================================
    // Arbitrator registry
    // =================================================================

    /// Register an arbitrator with a bonded stake.
    pub fn register_arbitrator(&self, account: AccountId, stake: Decimal) -> Result<()> {
        self.registry.lock().register(account, stake)
    }

    /// Remove an arbitrator; returns the stake to pay out.
    pub fn deregister_arbitrator(&self, account: AccountId) -> Result<Decimal> {
        self.registry.lock().deregister(account)
    }

    /// Withdraw stake; blocked while the arbitrator sits on any dispute.
    pub fn withdraw_arbitrator_stake(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> Result<Decimal> {
        self.registry.lock().withdraw_stake(account, amount)
    }

    /// Top up an arbitrator's stake.
    pub fn add_arbitrator_stake(&self, account: AccountId, amount: Decimal) -> Result<()> {
        self.registry.lock().add_stake(account, amount)
    }

    /// Toggle an arbitrator's panel-selection availability.
    pub fn set_arbitrator_active(&self, account: AccountId, active: bool) -> Result<()> {
        self.registry.lock().set_active(account, active)
    }

    /// Snapshot of one arbitrator record.
    #[must_use]
    pub fn arbitrator(&self, account: AccountId) -> Option<ArbitratorRecord> {
        self.registry.lock().get(account).cloned()
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Snapshot of one escrow record.
    pub fn escrow(&self, escrow_id: EscrowId) -> Result<Escrow<A>> {
        self.escrows.get(escrow_id)
    }

    /// Snapshot of one dispute record.
    pub fn dispute(&self, dispute_id: DisputeId) -> Result<Dispute<A>> {
        Ok(self.resolver.lock().get(dispute_id)?.clone())
    }

    /// The event log so far, in sequence order.
    #[must_use]
    pub fn events(&self) -> Vec<SequencedEvent<A>> {
        self.events.lock().entries.clone()
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &SettlementConfig<A> {
        &self.config
    }

    // =================================================================
    // Internals
    // =================================================================

    /// Apply a finalized dispute outcome: move escrow funds, then settle
    /// both sides' stakes (winner refunded, loser forfeited to the
    /// arbitration recipients).
    fn apply_outcome(&self, dispute: &Dispute<A>, outcome: DisputeOutcome) -> Result<()> {
        let arbitrated = self.escrows.apply_dispute_outcome(dispute.escrow_id, outcome)?;
        if let Some(dist) = &arbitrated.marketplace_fees {
            self.emit_fees(dispute.escrow_id, FeeKind::Marketplace, dist);
        }
        self.emit_fees(
            dispute.escrow_id,
            FeeKind::Arbitration,
            &arbitrated.arbitration_fees,
        );
        self.settle_stakes(dispute, arbitrated.paid_to)
    }

    /// Return the winner's stake lock to its owner; distribute the loser's
    /// through the arbitration fee schedule.
    fn settle_stakes(&self, dispute: &Dispute<A>, winner: AccountId) -> Result<()> {
        let (winner_lock, loser_lock) = if winner == dispute.raised_by {
            (Some(dispute.disputer_stake_lock), dispute.counter_stake_lock)
        } else {
            (dispute.counter_stake_lock, Some(dispute.disputer_stake_lock))
        };

        if let Some(lock) = winner_lock {
            self.ledger.release_lock(lock)?;
        }
        if let Some(lock) = loser_lock {
            let forfeited = self.ledger.locked_remaining(lock)?;
            if forfeited.is_zero() {
                self.ledger.release_lock(lock)?;
            } else {
                let dist = fees::split(&forfeited, &self.config.arbitration_shares)?;
                for (recipient, value) in dist.nonzero_shares() {
                    self.ledger.transfer_from_lock(lock, *recipient, value)?;
                }
                self.emit_fees(dispute.escrow_id, FeeKind::ForfeitedStake, &dist);
            }
        }
        Ok(())
    }

    fn emit_fees(&self, escrow_id: EscrowId, kind: FeeKind, dist: &FeeDistribution<A>) {
        for (recipient, value) in dist.nonzero_shares() {
            self.emit(SettlementEvent::FeeCollected {
                escrow_id,
                kind,
                recipient: *recipient,
                amount: value.clone(),
            });
        }
    }

    fn emit(&self, event: SettlementEvent<A>) {
        let mut log = self.events.lock();
        let seq = log.next_seq;
        log.next_seq += 1;
        tracing::info!(seq, event = event.label(), "settlement event");
        log.entries.push(SequencedEvent {
            seq,
            at: self.clock.now(),
            event,
        });
    }
}
