//! # opensettle-settlement
//!
//! The custody core and the external surface of the OpenSettle engine.
//!
//! ## Architecture
//!
//! - [`EscrowLedger`] — per-escrow state machines and fund custody.
//!   Single-writer-per-escrow: operations on different escrows are
//!   independent; operations on one escrow are linearized by its record
//!   mutex.
//! - [`SettlementCoordinator`] — the only component external callers
//!   interact with: create/release/refund/dispute/resolve/claim, the
//!   arbitrator registry surface, and the append-only event log.
//! - [`IdentityRegistry`] — optional Sybil-resistance gate on
//!   dispute-raising, consumed from the host, never implemented here.
//!
//! ## Fund movement
//!
//! Disbursement is pull-based: resolutions credit claimable balances in the
//! [`Ledger`](opensettle_ledger::Ledger) and recipients `claim` at their own
//! initiative, so one party's broken receiving path can never block the
//! other party's payout.

pub mod coordinator;
pub mod escrow_ledger;
pub mod identity;

pub use coordinator::SettlementCoordinator;
pub use escrow_ledger::{
    ArbitratedOutcome, DisputeContext, EscrowLedger, RefundOutcome, ReleaseOutcome,
};
pub use identity::{AllowList, IdentityRegistry};
