//! # Dispute — the arbitration sub-process owned by one escrow
//!
//! A dispute is raised by one escrow participant against the other, backed
//! by a stake and a commit-reveal seed for panel selection.
//!
//! ## State Machine
//!
//! ```text
//! ┌──────────────────────┐  reveal + select  ┌────────────────┐
//! │ AWAITING_COUNTERSTAKE├──────────────────▶│ PANEL_SELECTED │
//! └──────────┬───────────┘                   └───────┬────────┘
//!            │ deadline, no counter-stake            │ first vote
//!            ▼                                       ▼
//!      ┌───────────┐       deadline, no quorum ┌────────┐
//!      │ DEFAULTED │◀──────────────────────────┤ VOTING │
//!      └───────────┘                           └───┬────┘
//!                                        quorum    ▼
//!                                              ┌──────────┐
//!                                              │ RESOLVED │
//!                                              └──────────┘
//! ```
//!
//! An outcome is finalized exactly once: by majority vote, or by the
//! deadline default policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    AccountId, Amount, Asset, DisputeId, EscrowId, LockId, Result, SettleError,
    constants::SEED_COMMITMENT_DOMAIN,
};

/// The lifecycle phase of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputePhase {
    /// Waiting for the respondent to post a matching counter-stake.
    AwaitingCounterStake,
    /// Panel drawn; voting window open, no vote cast yet.
    PanelSelected,
    /// At least one vote cast; waiting for quorum.
    Voting,
    /// Majority outcome reached. **Irreversible.**
    Resolved,
    /// Deadline passed without counter-stake or quorum. **Irreversible.**
    Defaulted,
}

impl DisputePhase {
    /// Whether this phase admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Defaulted)
    }

    /// Can this dispute transition to the given target phase?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::AwaitingCounterStake,
                Self::PanelSelected | Self::Defaulted
            ) | (Self::PanelSelected, Self::Voting | Self::Defaulted)
                | (Self::Voting, Self::Resolved | Self::Defaulted)
        )
    }
}

impl std::fmt::Display for DisputePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingCounterStake => write!(f, "AWAITING_COUNTERSTAKE"),
            Self::PanelSelected => write!(f, "PANEL_SELECTED"),
            Self::Voting => write!(f, "VOTING"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Defaulted => write!(f, "DEFAULTED"),
        }
    }
}

/// What a panel member votes for: the direction funds should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    /// Funds go to the seller (minus fees).
    Release,
    /// Funds go back to the buyer (minus the arbitration fee).
    Refund,
}

impl std::fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Release => write!(f, "RELEASE"),
            Self::Refund => write!(f, "REFUND"),
        }
    }
}

/// One panel member's vote. Append-only; at most one per arbitrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub arbitrator: AccountId,
    pub choice: VoteChoice,
    pub cast_at: DateTime<Utc>,
}

/// The finalized (or pending) outcome of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeOutcome {
    /// No outcome yet.
    Pending,
    /// Majority voted to release to the seller.
    Release,
    /// Majority voted to refund the buyer.
    Refund,
    /// Deadline default: resolved in favor of the properly-staked party.
    Defaulted { favored: AccountId },
}

impl DisputeOutcome {
    /// Whether an outcome has been finalized.
    #[must_use]
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for DisputeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Release => write!(f, "RELEASE"),
            Self::Refund => write!(f, "REFUND"),
            Self::Defaulted { favored } => write!(f, "DEFAULTED({favored})"),
        }
    }
}

/// Commit a panel-selection seed: `sha256(domain || seed)`.
///
/// The disputer publishes this hash when raising the dispute and reveals the
/// seed only at panel-selection time, so the seed is fixed before any party
/// knows the selection-time entropy it will be mixed with.
#[must_use]
pub fn commit_seed(seed: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SEED_COMMITMENT_DOMAIN);
    hasher.update(seed);
    hasher.finalize().into()
}

/// One dispute, owned 1:1 by its escrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Dispute<A: Amount> {
    /// Monotonic identifier, assigned by the resolver.
    pub id: DisputeId,
    /// Back-reference to the owning escrow (not ownership).
    pub escrow_id: EscrowId,
    /// Asset the stakes are posted in (same as the escrow's).
    pub asset: Asset,
    /// The participant who raised the dispute.
    pub raised_by: AccountId,
    /// The counterparty expected to post the counter-stake.
    pub respondent: AccountId,
    /// Commit-reveal hash of the disputer's panel-selection seed.
    pub committed_hash: [u8; 32],
    /// When the seed was revealed (panel selection time).
    pub revealed_at: Option<DateTime<Utc>>,
    /// Stake each side must post: bps of the escrow amount.
    pub required_stake: A,
    /// Custody lock holding the disputer's stake.
    pub disputer_stake_lock: LockId,
    /// Custody lock holding the respondent's counter-stake, once posted.
    pub counter_stake_lock: Option<LockId>,
    /// The respondent must counter-stake before this instant.
    pub counter_stake_deadline: DateTime<Utc>,
    /// Votes must land before this instant. Set at panel selection.
    pub voting_deadline: Option<DateTime<Utc>>,
    /// The selected panel, in selection order. Odd fixed size.
    pub panel: Vec<AccountId>,
    /// Append-only vote list, at most one entry per panel member.
    pub votes: Vec<Vote>,
    /// Current lifecycle phase.
    pub phase: DisputePhase,
    /// Finalized outcome, `Pending` until quorum or default.
    pub outcome: DisputeOutcome,
}

impl<A: Amount> Dispute<A> {
    /// Whether the respondent has posted the matching counter-stake.
    #[must_use]
    pub fn has_counter_stake(&self) -> bool {
        self.counter_stake_lock.is_some()
    }

    /// Whether `account` sits on this dispute's panel.
    #[must_use]
    pub fn is_panel_member(&self, account: AccountId) -> bool {
        self.panel.contains(&account)
    }

    /// Whether `account` has already voted.
    #[must_use]
    pub fn has_voted(&self, account: AccountId) -> bool {
        self.votes.iter().any(|v| v.arbitrator == account)
    }

    /// Number of votes cast for `choice`.
    #[must_use]
    pub fn tally(&self, choice: VoteChoice) -> usize {
        self.votes.iter().filter(|v| v.choice == choice).count()
    }

    /// Attempt a phase transition, enforcing the machine's legality rules.
    ///
    /// # Errors
    /// Returns `InvalidState` for an illegal transition.
    pub fn transition(&mut self, target: DisputePhase) -> Result<()> {
        if !self.phase.can_transition_to(target) {
            return Err(SettleError::invalid_state(format!(
                "cannot transition {} from {} to {target}",
                self.id, self.phase
            )));
        }
        self.phase = target;
        Ok(())
    }
}
