//! # opensettle-arbitration
//!
//! Arbitration plane for the OpenSettle engine:
//!
//! - [`ArbitratorRegistry`] — bounded arena of staked arbitrators; stake
//!   can never leave while an arbitrator sits on a dispute.
//! - [`panel::select_panel`] — commit-reveal + selection-time entropy
//!   panel drawing that neither the disputer nor the entropy holder can
//!   grind alone.
//! - [`DisputeResolver`] — the per-dispute phase machine: counter-stakes,
//!   voting, quorum, and deadline defaults.
//! - [`EntropySource`] — injectable selection-time randomness.
//!
//! The resolver reports outcomes; applying them to escrow custody is the
//! settlement layer's job.

pub mod entropy;
pub mod panel;
pub mod registry;
pub mod resolver;

pub use entropy::{EntropySource, FixedEntropy, OsEntropy};
pub use registry::ArbitratorRegistry;
pub use resolver::{DisputeOpening, DisputeResolver};
