//! # opensettle-ledger
//!
//! The abstract atomic value-transfer collaborator consumed by the OpenSettle
//! engine, plus the pieces a host needs to run it:
//!
//! - [`Ledger`] — the custody interface: locks, pull-claimable disbursement,
//!   and balance queries. Every transfer is all-or-nothing.
//! - [`InMemoryLedger`] — reference implementation with an integrated
//!   supply-conservation audit.
//! - [`SupplyConservation`] — the deposits-minus-withdrawals invariant
//!   checker.
//! - [`Clock`] / [`SystemClock`] / [`ManualClock`] — injectable time, because
//!   expiry is advisory state acted on lazily, never by background timers.

pub mod clock;
pub mod conservation;
pub mod ledger;
pub mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use conservation::SupplyConservation;
pub use ledger::Ledger;
pub use memory::InMemoryLedger;
