//! Settlement events — the audit trail of the coordinator.
//!
//! Every state transition and every fund movement emits exactly one event,
//! including fee collection and default resolutions. Hosts index the event
//! log; the coordinator also mirrors each event to `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, Asset, DisputeId, DisputeOutcome, EscrowId, FeeKind, VoteChoice};

/// One settlement event, generic over the amount encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum SettlementEvent<A: Amount> {
    /// An escrow was created and its amount locked under custody.
    EscrowCreated {
        escrow_id: EscrowId,
        buyer: AccountId,
        seller: AccountId,
        asset: Asset,
        amount: A,
        expires_at: DateTime<Utc>,
    },
    /// The buyer released funds to the seller (undisputed path).
    EscrowReleased {
        escrow_id: EscrowId,
        seller: AccountId,
        /// Amount credited claimable to the seller, net of fees.
        amount: A,
    },
    /// The buyer was refunded in full (undisputed path), voluntarily or by
    /// lazy expiry.
    EscrowRefunded {
        escrow_id: EscrowId,
        buyer: AccountId,
        amount: A,
    },
    /// A participant raised the escrow's single lifetime dispute.
    DisputeRaised {
        escrow_id: EscrowId,
        dispute_id: DisputeId,
        raised_by: AccountId,
        stake: A,
    },
    /// The respondent posted the matching counter-stake.
    CounterStakePosted {
        dispute_id: DisputeId,
        respondent: AccountId,
        stake: A,
    },
    /// The arbitrator panel was drawn.
    PanelSelected {
        dispute_id: DisputeId,
        panel: Vec<AccountId>,
        voting_deadline: DateTime<Utc>,
    },
    /// A panel member cast a vote.
    VoteCast {
        dispute_id: DisputeId,
        arbitrator: AccountId,
        choice: VoteChoice,
    },
    /// A dispute reached quorum and was resolved.
    DisputeResolved {
        dispute_id: DisputeId,
        escrow_id: EscrowId,
        outcome: DisputeOutcome,
    },
    /// A dispute passed its deadline and was resolved by default policy.
    DisputeDefaulted {
        dispute_id: DisputeId,
        escrow_id: EscrowId,
        favored: AccountId,
    },
    /// A fee share was credited to a recipient.
    FeeCollected {
        escrow_id: EscrowId,
        kind: FeeKind,
        recipient: AccountId,
        amount: A,
    },
    /// A claimable balance was drained to its owner.
    FundsClaimed {
        asset: Asset,
        account: AccountId,
        amount: A,
    },
}

impl<A: Amount> SettlementEvent<A> {
    /// Stable label for log lines and host-side indexing.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::EscrowCreated { .. } => "ESCROW_CREATED",
            Self::EscrowReleased { .. } => "ESCROW_RELEASED",
            Self::EscrowRefunded { .. } => "ESCROW_REFUNDED",
            Self::DisputeRaised { .. } => "DISPUTE_RAISED",
            Self::CounterStakePosted { .. } => "COUNTER_STAKE_POSTED",
            Self::PanelSelected { .. } => "PANEL_SELECTED",
            Self::VoteCast { .. } => "VOTE_CAST",
            Self::DisputeResolved { .. } => "DISPUTE_RESOLVED",
            Self::DisputeDefaulted { .. } => "DISPUTE_DEFAULTED",
            Self::FeeCollected { .. } => "FEE_COLLECTED",
            Self::FundsClaimed { .. } => "FUNDS_CLAIMED",
        }
    }
}

impl<A: Amount> std::fmt::Display for SettlementEvent<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An event with its position in the coordinator's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SequencedEvent<A: Amount> {
    /// Monotonic sequence number, gap-free within one coordinator.
    pub seq: u64,
    /// When the coordinator recorded the event.
    pub at: DateTime<Utc>,
    /// The event payload.
    pub event: SettlementEvent<A>,
}
