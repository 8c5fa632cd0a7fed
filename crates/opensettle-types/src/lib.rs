//! # opensettle-types
//!
//! Shared types, errors, and configuration for the **OpenSettle** escrow
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`EscrowId`], [`DisputeId`], [`AccountId`], [`LockId`], [`Asset`]
//! - **Amount arithmetic**: [`Amount`], [`PlainAmount`], [`SealedAmount`]
//! - **Escrow model**: [`Escrow`], [`EscrowState`]
//! - **Dispute model**: [`Dispute`], [`DisputePhase`], [`DisputeOutcome`], [`Vote`], [`VoteChoice`]
//! - **Arbitrator model**: [`ArbitratorRecord`]
//! - **Fee model**: [`FeeShare`], [`FeeDistribution`], [`FeeKind`], [`fees::split`]
//! - **Events**: [`SettlementEvent`], [`SequencedEvent`]
//! - **Configuration**: [`SettlementConfig`]
//! - **Errors**: [`SettleError`] with `OS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod arbitrator;
pub mod config;
pub mod constants;
pub mod dispute;
pub mod error;
pub mod escrow;
pub mod event;
pub mod fees;
pub mod ids;

// Re-export all primary types at crate root for ergonomic imports:
//   use opensettle_types::{Escrow, EscrowState, Dispute, Amount, ...};

pub use amount::{Amount, PlainAmount, SealedAmount};
pub use arbitrator::ArbitratorRecord;
pub use config::SettlementConfig;
pub use dispute::{Dispute, DisputeOutcome, DisputePhase, Vote, VoteChoice, commit_seed};
pub use error::{Result, SettleError};
pub use escrow::{Escrow, EscrowState};
pub use event::{SequencedEvent, SettlementEvent};
pub use fees::{FeeDistribution, FeeKind, FeeShare};
pub use ids::{AccountId, Asset, DisputeId, EscrowId, LockId};

// Constants are accessed via `opensettle_types::constants::FOO`
// (not re-exported to avoid name collisions).
