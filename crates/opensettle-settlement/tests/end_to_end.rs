//! End-to-end integration tests across the whole engine.
//!
//! These tests exercise the full settlement lifecycle through the
//! coordinator: custody locking, voluntary release/refund, dispute raising,
//! counter-stakes, panel selection, voting, deadline defaults, pull-based
//! claims, and the supply-conservation audit after every scenario.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;

use opensettle_ledger::{InMemoryLedger, Ledger, ManualClock};
use opensettle_settlement::SettlementCoordinator;
use opensettle_types::{
    AccountId, Amount, DisputeOutcome, DisputePhase, EscrowId, EscrowState, FeeKind, PlainAmount,
    SealedAmount, SettleError, SettlementConfig, SettlementEvent, VoteChoice, commit_seed,
};

const SEED: [u8; 32] = [42u8; 32];

fn amt(v: u64) -> PlainAmount {
    PlainAmount::from(v)
}

/// Helper: a funded market with a buyer, a seller, a treasury, and a pool
/// of registered arbitrators.
struct Market {
    coordinator: SettlementCoordinator<PlainAmount, InMemoryLedger<PlainAmount>, ManualClock>,
    ledger: Arc<InMemoryLedger<PlainAmount>>,
    clock: Arc<ManualClock>,
    buyer: AccountId,
    seller: AccountId,
    treasury: AccountId,
    arbitrators: Vec<AccountId>,
}

impl Market {
    fn new() -> Self {
        // RUST_LOG=opensettle=debug surfaces the engine's tracing output.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::from_system());
        let buyer = AccountId::new();
        let seller = AccountId::new();
        let treasury = AccountId::new();

        ledger.deposit(buyer, "USDC", &amt(50_000)).unwrap();
        ledger.deposit(seller, "USDC", &amt(1_000)).unwrap();

        let config = SettlementConfig::new(amt(100), treasury);
        let coordinator =
            SettlementCoordinator::new(config, Arc::clone(&ledger), Arc::clone(&clock)).unwrap();

        let arbitrators: Vec<AccountId> = (0..6).map(|_| AccountId::new()).collect();
        for &a in &arbitrators {
            coordinator
                .register_arbitrator(a, Decimal::from(500u64))
                .unwrap();
        }

        Self {
            coordinator,
            ledger,
            clock,
            buyer,
            seller,
            treasury,
            arbitrators,
        }
    }

    fn open_escrow(&self, units: u64) -> EscrowId {
        self.coordinator
            .create_escrow(
                self.buyer,
                self.seller,
                "USDC",
                amt(units),
                Duration::days(7),
            )
            .unwrap()
    }

    fn event_labels(&self) -> Vec<&'static str> {
        self.coordinator
            .events()
            .iter()
            .map(|e| e.event.label())
            .collect()
    }
}

// =============================================================================
// Scenario A: voluntary release pays the seller minus the marketplace fee
// =============================================================================
#[test]
fn e2e_voluntary_release() {
    let market = Market::new();
    let id = market.open_escrow(10_000);

    market.coordinator.release_funds(id, market.buyer).unwrap();

    // 100 bps of 10_000 = 100 to the fee recipients, 9_900 to the seller.
    assert_eq!(
        market.ledger.claimable_of("USDC", market.seller),
        amt(9_900)
    );
    assert_eq!(
        market.ledger.claimable_of("USDC", market.treasury),
        amt(100)
    );

    // Pull-based: nothing lands in available until claimed.
    assert!(market.ledger.balance_of("USDC", market.seller).is_zero());
    let claimed = market.coordinator.claim("USDC", market.seller).unwrap();
    assert_eq!(claimed, amt(9_900));
    assert_eq!(market.ledger.balance_of("USDC", market.seller), amt(9_900));

    assert_eq!(
        market.coordinator.escrow(id).unwrap().state,
        EscrowState::Released
    );
    market.ledger.audit("USDC").unwrap();
}

// =============================================================================
// Scenario B: missed counter-stake defaults in the disputer's favor
// =============================================================================
#[test]
fn e2e_missed_counter_stake_defaults() {
    let market = Market::new();
    let id = market.open_escrow(10_000);

    let dispute_id = market
        .coordinator
        .raise_dispute(id, market.buyer, commit_seed(&SEED))
        .unwrap();

    // The seller never answers. Before the deadline, default is premature.
    let err = market
        .coordinator
        .trigger_default_resolution(dispute_id)
        .unwrap_err();
    assert!(matches!(err, SettleError::DeadlineNotReached(_)));

    market.clock.advance(Duration::hours(25));
    market
        .coordinator
        .trigger_default_resolution(dispute_id)
        .unwrap();

    // Buyer is favored: full amount minus the arbitration fee (50 bps of
    // 10_000 = 50) — the disputed-refund rule applies even on default.
    assert_eq!(
        market.ledger.claimable_of("USDC", market.buyer),
        amt(9_950)
    );
    assert_eq!(market.ledger.claimable_of("USDC", market.treasury), amt(50));

    // The buyer's dispute stake (10 = 0.1%) came back to available:
    // 50_000 - 10_000 escrowed - 10 staked + 10 returned.
    assert_eq!(market.ledger.balance_of("USDC", market.buyer), amt(40_000));
    // The seller posted nothing and forfeits nothing extra.
    assert_eq!(market.ledger.balance_of("USDC", market.seller), amt(1_000));

    assert_eq!(
        market.coordinator.escrow(id).unwrap().state,
        EscrowState::Defaulted
    );
    assert_eq!(
        market.coordinator.dispute(dispute_id).unwrap().phase,
        DisputePhase::Defaulted
    );
    assert!(market.event_labels().contains(&"DISPUTE_DEFAULTED"));
    market.ledger.audit("USDC").unwrap();
}

// =============================================================================
// Scenario C: dust escrow rejected at creation
// =============================================================================
#[test]
fn e2e_dust_escrow_rejected() {
    let market = Market::new();
    let err = market
        .coordinator
        .create_escrow(
            market.buyer,
            market.seller,
            "USDC",
            amt(1),
            Duration::days(7),
        )
        .unwrap_err();
    assert!(matches!(err, SettleError::AmountBelowMinimum { .. }));
    // Nothing was locked, nothing was recorded.
    assert_eq!(market.ledger.balance_of("USDC", market.buyer), amt(50_000));
    assert!(market.coordinator.events().is_empty());
}

// =============================================================================
// Scenario D: panel selection is not replayable from public information
// =============================================================================
#[test]
fn e2e_panel_selection_varies_across_disputes() {
    let market = Market::new();

    let mut panels = Vec::new();
    for _ in 0..3 {
        let id = market.open_escrow(10_000);
        let dispute_id = market
            .coordinator
            .raise_dispute(id, market.buyer, commit_seed(&SEED))
            .unwrap();
        market
            .coordinator
            .post_counter_stake(dispute_id, market.seller, &amt(10))
            .unwrap();
        let panel = market
            .coordinator
            .reveal_dispute(dispute_id, market.buyer, &SEED)
            .unwrap();

        // Structural checks: odd size, distinct, drawn from the registered
        // pool, participants excluded.
        assert_eq!(panel.len(), 3);
        let unique: HashSet<_> = panel.iter().copied().collect();
        assert_eq!(unique.len(), 3);
        assert!(panel.iter().all(|m| market.arbitrators.contains(m)));
        assert!(!panel.contains(&market.buyer));
        assert!(!panel.contains(&market.seller));
        panels.push(panel);
    }

    // Same seed, same pool — but fresh selection-time entropy and distinct
    // dispute ids. Identical draws across all three would mean the
    // unpredictable inputs are being ignored.
    let distinct: HashSet<Vec<AccountId>> = panels.into_iter().collect();
    assert!(distinct.len() > 1);
}

// =============================================================================
// Full arbitration: counter-stake, reveal, quorum vote, stake forfeiture
// =============================================================================
#[test]
fn e2e_full_arbitration_release() {
    let market = Market::new();
    let id = market.open_escrow(10_000);

    // Buyer disputes; seller answers with the matching counter-stake.
    let dispute_id = market
        .coordinator
        .raise_dispute(id, market.buyer, commit_seed(&SEED))
        .unwrap();
    market
        .coordinator
        .post_counter_stake(dispute_id, market.seller, &amt(10))
        .unwrap();
    let panel = market
        .coordinator
        .reveal_dispute(dispute_id, market.buyer, &SEED)
        .unwrap();

    // A seated arbitrator cannot pull its registry stake mid-dispute.
    let err = market
        .coordinator
        .withdraw_arbitrator_stake(panel[0], Decimal::from(500u64))
        .unwrap_err();
    assert!(matches!(err, SettleError::ArbitratorBusy { .. }));

    // 2-of-3 quorum for RELEASE.
    let first = market
        .coordinator
        .cast_vote(dispute_id, panel[0], VoteChoice::Release)
        .unwrap();
    assert!(first.is_none());
    let second = market
        .coordinator
        .cast_vote(dispute_id, panel[1], VoteChoice::Release)
        .unwrap();
    assert_eq!(second, Some(DisputeOutcome::Release));

    // Seller receives 10_000 - 100 (marketplace) - 50 (arbitration) = 9_850.
    assert_eq!(
        market.ledger.claimable_of("USDC", market.seller),
        amt(9_850)
    );
    // Treasury: 100 marketplace + 50 arbitration + 10 forfeited buyer stake.
    assert_eq!(
        market.ledger.claimable_of("USDC", market.treasury),
        amt(160)
    );
    // The winning seller's counter-stake came back to available.
    assert_eq!(market.ledger.balance_of("USDC", market.seller), amt(1_000));

    // Panel assignments were released: stake withdrawal works again.
    market
        .coordinator
        .withdraw_arbitrator_stake(panel[0], Decimal::from(500u64))
        .unwrap();

    // One terminal event, one fee event per movement kind.
    let labels = market.event_labels();
    assert_eq!(
        labels.iter().filter(|&&l| l == "DISPUTE_RESOLVED").count(),
        1
    );
    assert_eq!(labels.iter().filter(|&&l| l == "VOTE_CAST").count(), 2);
    let fee_kinds: Vec<FeeKind> = market
        .coordinator
        .events()
        .iter()
        .filter_map(|e| match &e.event {
            SettlementEvent::FeeCollected { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert!(fee_kinds.contains(&FeeKind::Marketplace));
    assert!(fee_kinds.contains(&FeeKind::Arbitration));
    assert!(fee_kinds.contains(&FeeKind::ForfeitedStake));

    assert_eq!(
        market.coordinator.escrow(id).unwrap().state,
        EscrowState::Released
    );
    market.ledger.audit("USDC").unwrap();
}

// =============================================================================
// Disputed refund charges the arbitration fee symmetrically
// =============================================================================
#[test]
fn e2e_full_arbitration_refund_fee_symmetry() {
    let market = Market::new();
    let id = market.open_escrow(10_000);

    let dispute_id = market
        .coordinator
        .raise_dispute(id, market.seller, commit_seed(&SEED))
        .unwrap();
    market
        .coordinator
        .post_counter_stake(dispute_id, market.buyer, &amt(10))
        .unwrap();
    let panel = market
        .coordinator
        .reveal_dispute(dispute_id, market.seller, &SEED)
        .unwrap();

    market
        .coordinator
        .cast_vote(dispute_id, panel[0], VoteChoice::Refund)
        .unwrap();
    let outcome = market
        .coordinator
        .cast_vote(dispute_id, panel[1], VoteChoice::Refund)
        .unwrap();
    assert_eq!(outcome, Some(DisputeOutcome::Refund));

    // Buyer gets 10_000 minus the same 50-unit arbitration fee a release
    // would have paid — no marketplace fee on the buyer-directed path.
    assert_eq!(
        market.ledger.claimable_of("USDC", market.buyer),
        amt(9_950)
    );
    // Treasury: 50 arbitration + 10 forfeited stake from the losing seller.
    assert_eq!(market.ledger.claimable_of("USDC", market.treasury), amt(60));

    assert_eq!(
        market.coordinator.escrow(id).unwrap().state,
        EscrowState::Refunded
    );
    market.ledger.audit("USDC").unwrap();
}

// =============================================================================
// Lazy expiry: anyone can refund an expired, undisputed escrow — fee-free
// =============================================================================
#[test]
fn e2e_lazy_expiry_refund() {
    let market = Market::new();
    let id = market.open_escrow(10_000);

    market.clock.advance(Duration::days(8));
    let stranger = AccountId::new();
    market.coordinator.refund_buyer(id, stranger).unwrap();

    assert_eq!(
        market.ledger.claimable_of("USDC", market.buyer),
        amt(10_000)
    );
    assert!(market.ledger.claimable_of("USDC", market.treasury).is_zero());
    market.ledger.audit("USDC").unwrap();
}

// =============================================================================
// Claim idempotence
// =============================================================================
#[test]
fn e2e_claim_is_idempotent() {
    let market = Market::new();
    let id = market.open_escrow(10_000);
    market.coordinator.release_funds(id, market.buyer).unwrap();

    assert_eq!(
        market.coordinator.claim("USDC", market.seller).unwrap(),
        amt(9_900)
    );
    // Draining twice in a row yields zero the second time, without error.
    assert!(
        market
            .coordinator
            .claim("USDC", market.seller)
            .unwrap()
            .is_zero()
    );
    // And a claim against an empty pool succeeds with zero too.
    assert!(
        market
            .coordinator
            .claim("USDC", AccountId::new())
            .unwrap()
            .is_zero()
    );
    market.ledger.audit("USDC").unwrap();
}

// =============================================================================
// Exactly-once resolution across every resolving entry point
// =============================================================================
#[test]
fn e2e_resolution_is_exactly_once() {
    let market = Market::new();
    let id = market.open_escrow(10_000);
    market.coordinator.release_funds(id, market.buyer).unwrap();

    let err = market
        .coordinator
        .release_funds(id, market.buyer)
        .unwrap_err();
    assert!(matches!(err, SettleError::AlreadyResolved(e) if e == id));
    let err = market
        .coordinator
        .refund_buyer(id, market.seller)
        .unwrap_err();
    assert!(matches!(err, SettleError::AlreadyResolved(_)));
    let err = market
        .coordinator
        .raise_dispute(id, market.buyer, commit_seed(&SEED))
        .unwrap_err();
    assert!(matches!(err, SettleError::AlreadyResolved(_)));

    // Exactly one terminal event in the log.
    let labels = market.event_labels();
    let terminal = labels
        .iter()
        .filter(|&&l| {
            matches!(
                l,
                "ESCROW_RELEASED" | "ESCROW_REFUNDED" | "DISPUTE_RESOLVED" | "DISPUTE_DEFAULTED"
            )
        })
        .count();
    assert_eq!(terminal, 1);
}

// =============================================================================
// The sealed (private) variant drives the identical state machine
// =============================================================================
#[test]
fn e2e_sealed_variant_matches_plain_fee_handling() {
    let ledger: Arc<InMemoryLedger<SealedAmount>> = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::from_system());
    let buyer = AccountId::new();
    let seller = AccountId::new();
    let treasury = AccountId::new();
    ledger
        .deposit(buyer, "USDC", &SealedAmount::seal(50_000))
        .unwrap();

    let config = SettlementConfig::new(SealedAmount::seal(100), treasury);
    let coordinator =
        SettlementCoordinator::new(config, Arc::clone(&ledger), Arc::clone(&clock)).unwrap();

    let id = coordinator
        .create_escrow(
            buyer,
            seller,
            "USDC",
            SealedAmount::seal(10_000),
            Duration::days(7),
        )
        .unwrap();
    let dispute_id = coordinator
        .raise_dispute(id, buyer, commit_seed(&SEED))
        .unwrap();

    clock.advance(Duration::hours(25));
    coordinator.trigger_default_resolution(dispute_id).unwrap();

    // Same numbers as the plain scenario B: 9_950 to the buyer, 50
    // arbitration fee — the sealed path cannot drift because it runs the
    // same engine.
    assert_eq!(ledger.claimable_of("USDC", buyer).reveal(), 9_950);
    assert_eq!(ledger.claimable_of("USDC", treasury).reveal(), 50);
    assert_eq!(
        coordinator.escrow(id).unwrap().state,
        EscrowState::Defaulted
    );
    ledger.audit("USDC").unwrap();
}
