//! The dispute resolver: counter-stakes, panel selection, and voting.
//!
//! Owns every [`Dispute`] record and drives its phase machine. The resolver
//! never touches escrow custody — it reports outcomes and the settlement
//! layer applies them — and it never creates a dispute except through
//! [`DisputeResolver::open`], so no vote or release path can implicitly
//! move an escrow into arbitration.

use chrono::{DateTime, Duration, Utc};

use std::collections::HashMap;

use opensettle_types::{
    AccountId, Amount, Asset, Dispute, DisputeId, DisputeOutcome, DisputePhase, EscrowId, LockId,
    Result, SettleError, Vote, VoteChoice, commit_seed,
};

use crate::{ArbitratorRegistry, panel};

/// Everything the settlement layer knows when a dispute is raised.
#[derive(Debug, Clone)]
pub struct DisputeOpening<A: Amount> {
    pub escrow_id: EscrowId,
    pub asset: Asset,
    pub raised_by: AccountId,
    pub respondent: AccountId,
    pub committed_hash: [u8; 32],
    pub required_stake: A,
    pub disputer_stake_lock: LockId,
}

/// Selects panels, collects votes, and determines outcomes.
#[derive(Debug)]
pub struct DisputeResolver<A: Amount> {
    disputes: HashMap<DisputeId, Dispute<A>>,
    next_id: u64,
}

impl<A: Amount> DisputeResolver<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            disputes: HashMap::new(),
            next_id: 0,
        }
    }

    /// Open a dispute in `AWAITING_COUNTERSTAKE`.
    pub fn open(
        &mut self,
        opening: DisputeOpening<A>,
        now: DateTime<Utc>,
        counter_stake_window: Duration,
    ) -> DisputeId {
        let id = DisputeId(self.next_id);
        self.next_id += 1;
        self.disputes.insert(
            id,
            Dispute {
                id,
                escrow_id: opening.escrow_id,
                asset: opening.asset,
                raised_by: opening.raised_by,
                respondent: opening.respondent,
                committed_hash: opening.committed_hash,
                revealed_at: None,
                required_stake: opening.required_stake,
                disputer_stake_lock: opening.disputer_stake_lock,
                counter_stake_lock: None,
                counter_stake_deadline: now + counter_stake_window,
                voting_deadline: None,
                panel: Vec::new(),
                votes: Vec::new(),
                phase: DisputePhase::AwaitingCounterStake,
                outcome: DisputeOutcome::Pending,
            },
        );
        tracing::info!(dispute = %id, escrow = %opening.escrow_id, "dispute opened");
        id
    }

    /// Look up a dispute.
    pub fn get(&self, id: DisputeId) -> Result<&Dispute<A>> {
        self.disputes
            .get(&id)
            .ok_or(SettleError::DisputeNotFound(id))
    }

    /// Validate a counter-stake attempt without mutating anything. The
    /// settlement layer locks the funds between this check and
    /// [`Self::record_counter_stake`].
    pub fn check_counter_stake(
        &self,
        id: DisputeId,
        caller: AccountId,
        posted: &A,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let dispute = self.get(id)?;
        if dispute.phase != DisputePhase::AwaitingCounterStake {
            return Err(SettleError::invalid_state(format!(
                "{id} is {}, counter-stake requires AWAITING_COUNTERSTAKE",
                dispute.phase
            )));
        }
        if dispute.has_counter_stake() {
            return Err(SettleError::invalid_state(format!(
                "{id} already has a counter-stake"
            )));
        }
        if caller != dispute.respondent {
            return Err(SettleError::not_authorized(format!(
                "only the respondent may counter-stake {id}"
            )));
        }
        if now > dispute.counter_stake_deadline {
            return Err(SettleError::DeadlinePassed(id));
        }
        if posted != &dispute.required_stake {
            return Err(SettleError::CounterStakeMismatch {
                required: dispute.required_stake.to_string(),
                posted: posted.to_string(),
            });
        }
        Ok(())
    }

    /// Record the lock holding a validated counter-stake.
    pub fn record_counter_stake(&mut self, id: DisputeId, lock: LockId) -> Result<()> {
        let dispute = self
            .disputes
            .get_mut(&id)
            .ok_or(SettleError::DisputeNotFound(id))?;
        dispute.counter_stake_lock = Some(lock);
        Ok(())
    }

    /// Reveal the committed seed and draw the panel.
    ///
    /// Requires the counter-stake to be posted: an unanswered dispute
    /// resolves by default, it never goes to a panel.
    ///
    /// # Errors
    /// - `NotAuthorized` unless called by the disputer
    /// - `InvalidState` before the counter-stake or after selection
    /// - `CommitmentMismatch` if `sha256(seed)` is not the committed hash
    /// - `ArbitratorUnavailable` if the registry cannot seat a panel
    pub fn reveal_and_select_panel(
        &mut self,
        id: DisputeId,
        caller: AccountId,
        seed: &[u8; 32],
        registry: &mut ArbitratorRegistry,
        panel_size: usize,
        entropy: &[u8; 32],
        voting_window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccountId>> {
        let dispute = self
            .disputes
            .get_mut(&id)
            .ok_or(SettleError::DisputeNotFound(id))?;
        if dispute.phase != DisputePhase::AwaitingCounterStake {
            return Err(SettleError::invalid_state(format!(
                "{id} is {}, reveal requires AWAITING_COUNTERSTAKE",
                dispute.phase
            )));
        }
        if !dispute.has_counter_stake() {
            return Err(SettleError::invalid_state(format!(
                "{id} has no counter-stake; await it or trigger default resolution"
            )));
        }
        if caller != dispute.raised_by {
            return Err(SettleError::not_authorized(format!(
                "only the disputer may reveal the seed for {id}"
            )));
        }
        if commit_seed(seed) != dispute.committed_hash {
            return Err(SettleError::CommitmentMismatch);
        }

        let exclude = [dispute.raised_by, dispute.respondent];
        let selected = panel::select_panel(registry, &exclude, panel_size, seed, entropy, id)?;
        registry.mark_assigned(&selected)?;

        dispute.transition(DisputePhase::PanelSelected)?;
        dispute.revealed_at = Some(now);
        dispute.voting_deadline = Some(now + voting_window);
        dispute.panel.clone_from(&selected);
        tracing::info!(dispute = %id, panel = selected.len(), "panel selected");
        Ok(selected)
    }

    /// Cast one panel member's vote. Returns the outcome if this vote
    /// reached quorum.
    ///
    /// # Errors
    /// - `QuorumReached` on an already-resolved dispute
    /// - `InvalidState` before panel selection or after a default
    /// - `DeadlinePassed` after the voting deadline
    /// - `NotOnPanel` / `AlreadyVoted` for bad voters
    pub fn cast_vote(
        &mut self,
        id: DisputeId,
        arbitrator: AccountId,
        choice: VoteChoice,
        now: DateTime<Utc>,
        registry: &mut ArbitratorRegistry,
    ) -> Result<Option<DisputeOutcome>> {
        let dispute = self
            .disputes
            .get_mut(&id)
            .ok_or(SettleError::DisputeNotFound(id))?;
        match dispute.phase {
            DisputePhase::PanelSelected | DisputePhase::Voting => {}
            DisputePhase::Resolved => return Err(SettleError::QuorumReached(id)),
            phase => {
                return Err(SettleError::invalid_state(format!(
                    "cannot vote on {id} in {phase}"
                )));
            }
        }
        let deadline = dispute
            .voting_deadline
            .ok_or_else(|| SettleError::Internal(format!("{id} in voting phase without deadline")))?;
        if now > deadline {
            return Err(SettleError::DeadlinePassed(id));
        }
        if !dispute.is_panel_member(arbitrator) {
            return Err(SettleError::NotOnPanel(arbitrator));
        }
        if dispute.has_voted(arbitrator) {
            return Err(SettleError::AlreadyVoted(arbitrator));
        }

        if dispute.phase == DisputePhase::PanelSelected {
            dispute.transition(DisputePhase::Voting)?;
        }
        dispute.votes.push(Vote {
            arbitrator,
            choice,
            cast_at: now,
        });
        tracing::info!(dispute = %id, %arbitrator, %choice, "vote cast");

        // Odd panel size: the first choice to reach floor(n/2)+1 wins and
        // a tie is impossible by construction.
        let quorum = dispute.panel.len() / 2 + 1;
        if dispute.tally(choice) < quorum {
            return Ok(None);
        }

        let outcome = match choice {
            VoteChoice::Release => DisputeOutcome::Release,
            VoteChoice::Refund => DisputeOutcome::Refund,
        };
        dispute.outcome = outcome;
        dispute.transition(DisputePhase::Resolved)?;
        let panel = dispute.panel.clone();
        registry.release_assignment(&panel)?;
        tracing::info!(dispute = %id, %outcome, "dispute resolved by quorum");
        Ok(Some(outcome))
    }

    /// Resolve a dispute whose deadline passed without progress. Callable
    /// by anyone; returns the favored party.
    ///
    /// Default policy: the disputer's stake is always properly posted, so
    /// the disputer prevails — both when the respondent never answered and
    /// when a seated panel failed to reach quorum in time.
    ///
    /// If the panel was never selected (seed unrevealed), the voting window
    /// is measured from the counter-stake deadline.
    ///
    /// # Errors
    /// - `InvalidState` on an already-terminal dispute
    /// - `DeadlineNotReached` before the relevant deadline
    pub fn trigger_default(
        &mut self,
        id: DisputeId,
        now: DateTime<Utc>,
        voting_window: Duration,
        registry: &mut ArbitratorRegistry,
    ) -> Result<AccountId> {
        let dispute = self
            .disputes
            .get_mut(&id)
            .ok_or(SettleError::DisputeNotFound(id))?;
        if dispute.phase.is_terminal() {
            return Err(SettleError::invalid_state(format!(
                "{id} is already {}",
                dispute.phase
            )));
        }

        let deadline = if dispute.has_counter_stake() {
            dispute
                .voting_deadline
                .unwrap_or(dispute.counter_stake_deadline + voting_window)
        } else {
            dispute.counter_stake_deadline
        };
        if now <= deadline {
            return Err(SettleError::DeadlineNotReached(id));
        }

        let favored = dispute.raised_by;
        dispute.outcome = DisputeOutcome::Defaulted { favored };
        dispute.transition(DisputePhase::Defaulted)?;
        if !dispute.panel.is_empty() {
            let panel = dispute.panel.clone();
            registry.release_assignment(&panel)?;
        }
        tracing::info!(dispute = %id, %favored, "dispute defaulted");
        Ok(favored)
    }

    /// Number of disputes ever opened.
    #[must_use]
    pub fn len(&self) -> usize {
        self.disputes.len()
    }

    /// Whether no dispute was ever opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disputes.is_empty()
    }
}

impl<A: Amount> Default for DisputeResolver<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use opensettle_types::PlainAmount;

    const SEED: [u8; 32] = [7u8; 32];
    const ENTROPY: [u8; 32] = [9u8; 32];

    struct Fixture {
        resolver: DisputeResolver<PlainAmount>,
        registry: ArbitratorRegistry,
        arbitrators: Vec<AccountId>,
        buyer: AccountId,
        seller: AccountId,
        dispute: DisputeId,
        now: DateTime<Utc>,
    }

    fn window() -> Duration {
        Duration::hours(24)
    }

    fn fixture() -> Fixture {
        let mut registry = ArbitratorRegistry::new(64, Decimal::from(100u64));
        let arbitrators: Vec<AccountId> = (0..5).map(|_| AccountId::new()).collect();
        for &a in &arbitrators {
            registry.register(a, Decimal::from(100u64)).unwrap();
        }

        let buyer = AccountId::new();
        let seller = AccountId::new();
        let now = Utc::now();
        let mut resolver = DisputeResolver::new();
        let dispute = resolver.open(
            DisputeOpening {
                escrow_id: EscrowId(1),
                asset: "USDC".to_string(),
                raised_by: buyer,
                respondent: seller,
                committed_hash: commit_seed(&SEED),
                required_stake: PlainAmount::from(10u64),
                disputer_stake_lock: LockId::new(),
            },
            now,
            window(),
        );
        Fixture {
            resolver,
            registry,
            arbitrators,
            buyer,
            seller,
            dispute,
            now,
        }
    }

    fn counter_stake(fx: &mut Fixture) {
        fx.resolver
            .check_counter_stake(fx.dispute, fx.seller, &PlainAmount::from(10u64), fx.now)
            .unwrap();
        fx.resolver
            .record_counter_stake(fx.dispute, LockId::new())
            .unwrap();
    }

    fn select_panel(fx: &mut Fixture) -> Vec<AccountId> {
        fx.resolver
            .reveal_and_select_panel(
                fx.dispute,
                fx.buyer,
                &SEED,
                &mut fx.registry,
                3,
                &ENTROPY,
                window(),
                fx.now,
            )
            .unwrap()
    }

    #[test]
    fn open_sets_deadline_and_phase() {
        let fx = fixture();
        let dispute = fx.resolver.get(fx.dispute).unwrap();
        assert_eq!(dispute.phase, DisputePhase::AwaitingCounterStake);
        assert_eq!(dispute.counter_stake_deadline, fx.now + window());
        assert_eq!(dispute.outcome, DisputeOutcome::Pending);
    }

    #[test]
    fn counter_stake_only_by_respondent() {
        let fx = fixture();
        let err = fx
            .resolver
            .check_counter_stake(fx.dispute, fx.buyer, &PlainAmount::from(10u64), fx.now)
            .unwrap_err();
        assert!(matches!(err, SettleError::NotAuthorized { .. }));
    }

    #[test]
    fn counter_stake_must_match() {
        let fx = fixture();
        let err = fx
            .resolver
            .check_counter_stake(fx.dispute, fx.seller, &PlainAmount::from(9u64), fx.now)
            .unwrap_err();
        assert!(matches!(err, SettleError::CounterStakeMismatch { .. }));
    }

    #[test]
    fn counter_stake_after_deadline_rejected() {
        let fx = fixture();
        let late = fx.now + window() + Duration::seconds(1);
        let err = fx
            .resolver
            .check_counter_stake(fx.dispute, fx.seller, &PlainAmount::from(10u64), late)
            .unwrap_err();
        assert!(matches!(err, SettleError::DeadlinePassed(_)));
    }

    #[test]
    fn reveal_requires_counter_stake() {
        let mut fx = fixture();
        let err = fx
            .resolver
            .reveal_and_select_panel(
                fx.dispute,
                fx.buyer,
                &SEED,
                &mut fx.registry,
                3,
                &ENTROPY,
                window(),
                fx.now,
            )
            .unwrap_err();
        assert!(matches!(err, SettleError::InvalidState { .. }));
    }

    #[test]
    fn reveal_rejects_wrong_seed() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let err = fx
            .resolver
            .reveal_and_select_panel(
                fx.dispute,
                fx.buyer,
                &[8u8; 32],
                &mut fx.registry,
                3,
                &ENTROPY,
                window(),
                fx.now,
            )
            .unwrap_err();
        assert!(matches!(err, SettleError::CommitmentMismatch));
    }

    #[test]
    fn panel_selection_assigns_arbitrators() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);
        assert_eq!(panel.len(), 3);
        for member in &panel {
            assert_eq!(fx.registry.get(*member).unwrap().assigned_disputes, 1);
        }
        let dispute = fx.resolver.get(fx.dispute).unwrap();
        assert_eq!(dispute.phase, DisputePhase::PanelSelected);
        assert_eq!(dispute.voting_deadline, Some(fx.now + window()));
    }

    #[test]
    fn voting_before_panel_is_invalid_state() {
        // A vote can never be the thing that moves an escrow into
        // arbitration: voting on an unselected dispute is rejected outright.
        let mut fx = fixture();
        let arbitrator = fx.arbitrators[0];
        let err = fx
            .resolver
            .cast_vote(
                fx.dispute,
                arbitrator,
                VoteChoice::Release,
                fx.now,
                &mut fx.registry,
            )
            .unwrap_err();
        assert!(matches!(err, SettleError::InvalidState { .. }));
    }

    #[test]
    fn quorum_resolves_and_releases_assignments() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);

        let first = fx
            .resolver
            .cast_vote(
                fx.dispute,
                panel[0],
                VoteChoice::Refund,
                fx.now,
                &mut fx.registry,
            )
            .unwrap();
        assert!(first.is_none());

        let second = fx
            .resolver
            .cast_vote(
                fx.dispute,
                panel[1],
                VoteChoice::Refund,
                fx.now,
                &mut fx.registry,
            )
            .unwrap();
        assert_eq!(second, Some(DisputeOutcome::Refund));

        let dispute = fx.resolver.get(fx.dispute).unwrap();
        assert_eq!(dispute.phase, DisputePhase::Resolved);
        for member in &panel {
            assert_eq!(fx.registry.get(*member).unwrap().assigned_disputes, 0);
        }
    }

    #[test]
    fn split_vote_needs_majority() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);

        fx.resolver
            .cast_vote(
                fx.dispute,
                panel[0],
                VoteChoice::Refund,
                fx.now,
                &mut fx.registry,
            )
            .unwrap();
        let after_opposed = fx
            .resolver
            .cast_vote(
                fx.dispute,
                panel[1],
                VoteChoice::Release,
                fx.now,
                &mut fx.registry,
            )
            .unwrap();
        assert!(after_opposed.is_none());

        let decisive = fx
            .resolver
            .cast_vote(
                fx.dispute,
                panel[2],
                VoteChoice::Release,
                fx.now,
                &mut fx.registry,
            )
            .unwrap();
        assert_eq!(decisive, Some(DisputeOutcome::Release));
    }

    #[test]
    fn non_panel_vote_rejected() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);
        let outsider = fx
            .arbitrators
            .iter()
            .copied()
            .find(|a| !panel.contains(a))
            .unwrap();
        let err = fx
            .resolver
            .cast_vote(
                fx.dispute,
                outsider,
                VoteChoice::Release,
                fx.now,
                &mut fx.registry,
            )
            .unwrap_err();
        assert!(matches!(err, SettleError::NotOnPanel(a) if a == outsider));
    }

    #[test]
    fn double_vote_rejected() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);
        fx.resolver
            .cast_vote(
                fx.dispute,
                panel[0],
                VoteChoice::Refund,
                fx.now,
                &mut fx.registry,
            )
            .unwrap();
        let err = fx
            .resolver
            .cast_vote(
                fx.dispute,
                panel[0],
                VoteChoice::Release,
                fx.now,
                &mut fx.registry,
            )
            .unwrap_err();
        assert!(matches!(err, SettleError::AlreadyVoted(a) if a == panel[0]));
    }

    #[test]
    fn vote_after_quorum_rejected() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);
        for member in &panel[..2] {
            fx.resolver
                .cast_vote(
                    fx.dispute,
                    *member,
                    VoteChoice::Release,
                    fx.now,
                    &mut fx.registry,
                )
                .unwrap();
        }
        let err = fx
            .resolver
            .cast_vote(
                fx.dispute,
                panel[2],
                VoteChoice::Release,
                fx.now,
                &mut fx.registry,
            )
            .unwrap_err();
        assert!(matches!(err, SettleError::QuorumReached(_)));
    }

    #[test]
    fn late_vote_rejected() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);
        let late = fx.now + window() + Duration::seconds(1);
        let err = fx
            .resolver
            .cast_vote(
                fx.dispute,
                panel[0],
                VoteChoice::Release,
                late,
                &mut fx.registry,
            )
            .unwrap_err();
        assert!(matches!(err, SettleError::DeadlinePassed(_)));
    }

    #[test]
    fn default_before_deadline_rejected() {
        let mut fx = fixture();
        let err = fx
            .resolver
            .trigger_default(fx.dispute, fx.now, window(), &mut fx.registry)
            .unwrap_err();
        assert!(matches!(err, SettleError::DeadlineNotReached(_)));
    }

    #[test]
    fn missed_counter_stake_defaults_to_disputer() {
        let mut fx = fixture();
        let after = fx.now + window() + Duration::seconds(1);
        let favored = fx
            .resolver
            .trigger_default(fx.dispute, after, window(), &mut fx.registry)
            .unwrap();
        assert_eq!(favored, fx.buyer);
        let dispute = fx.resolver.get(fx.dispute).unwrap();
        assert_eq!(dispute.phase, DisputePhase::Defaulted);
        assert_eq!(
            dispute.outcome,
            DisputeOutcome::Defaulted { favored: fx.buyer }
        );
    }

    #[test]
    fn stalled_voting_defaults_and_releases_panel() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        let panel = select_panel(&mut fx);
        fx.resolver
            .cast_vote(
                fx.dispute,
                panel[0],
                VoteChoice::Release,
                fx.now,
                &mut fx.registry,
            )
            .unwrap();

        let after = fx.now + window() + Duration::seconds(1);
        let favored = fx
            .resolver
            .trigger_default(fx.dispute, after, window(), &mut fx.registry)
            .unwrap();
        assert_eq!(favored, fx.buyer);
        for member in &panel {
            assert_eq!(fx.registry.get(*member).unwrap().assigned_disputes, 0);
        }
    }

    #[test]
    fn default_twice_rejected() {
        let mut fx = fixture();
        let after = fx.now + window() + Duration::seconds(1);
        fx.resolver
            .trigger_default(fx.dispute, after, window(), &mut fx.registry)
            .unwrap();
        let err = fx
            .resolver
            .trigger_default(fx.dispute, after, window(), &mut fx.registry)
            .unwrap_err();
        assert!(matches!(err, SettleError::InvalidState { .. }));
    }

    #[test]
    fn unrevealed_dispute_defaults_after_fallback_window() {
        let mut fx = fixture();
        counter_stake(&mut fx);
        // Counter-stake posted but seed never revealed: the fallback
        // deadline is counter_stake_deadline + voting_window.
        let not_yet = fx.now + window() + Duration::seconds(1);
        let err = fx
            .resolver
            .trigger_default(fx.dispute, not_yet, window(), &mut fx.registry)
            .unwrap_err();
        assert!(matches!(err, SettleError::DeadlineNotReached(_)));

        let after = fx.now + window() + window() + Duration::seconds(1);
        let favored = fx
            .resolver
            .trigger_default(fx.dispute, after, window(), &mut fx.registry)
            .unwrap();
        assert_eq!(favored, fx.buyer);
    }
}
