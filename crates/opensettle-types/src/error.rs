//! Error types for the OpenSettle settlement engine.
//!
//! All errors use the `OS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Input validation errors
//! - 2xx: Authorization errors
//! - 3xx: State machine errors
//! - 4xx: Dispute / stake errors
//! - 5xx: Arbitrator registry errors
//! - 6xx: Ledger / balance errors
//! - 9xx: General / internal errors
//!
//! Amounts inside error payloads are carried as display strings because a
//! sealed amount has no readable numeric form.

use thiserror::Error;

use crate::{AccountId, DisputeId, EscrowId, LockId};

/// Central error enum for all OpenSettle operations.
#[derive(Debug, Error)]
pub enum SettleError {
    // =================================================================
    // Input Validation Errors (1xx)
    // =================================================================
    /// The request failed structural validation (zero amount, bad window, etc.).
    #[error("OS_ERR_100: Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The escrow amount is below the configured minimum (dust escrow).
    #[error("OS_ERR_101: Amount {amount} below minimum {minimum}")]
    AmountBelowMinimum { amount: String, minimum: String },

    /// Buyer and seller are the same account.
    #[error("OS_ERR_102: Self-dealing: buyer and seller are the same account")]
    SelfDealing,

    /// The settlement configuration failed validation.
    #[error("OS_ERR_103: Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// The caller is not permitted to perform this operation.
    #[error("OS_ERR_200: Not authorized: {reason}")]
    NotAuthorized { reason: String },

    /// The caller is not registered with the identity collaborator.
    #[error("OS_ERR_201: Account not registered: {0}")]
    NotRegistered(AccountId),

    // =================================================================
    // State Machine Errors (3xx)
    // =================================================================
    /// The operation is not valid in the current escrow/dispute state.
    #[error("OS_ERR_300: Invalid state: {reason}")]
    InvalidState { reason: String },

    /// The escrow has already reached a terminal state (exactly-once guard).
    #[error("OS_ERR_301: Escrow already resolved: {0}")]
    AlreadyResolved(EscrowId),

    /// The requested escrow does not exist.
    #[error("OS_ERR_302: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// The requested dispute does not exist.
    #[error("OS_ERR_303: Dispute not found: {0}")]
    DisputeNotFound(DisputeId),

    /// The escrow has expired and the attempted operation requires a live one.
    #[error("OS_ERR_304: Escrow expired: {0}")]
    Expired(EscrowId),

    /// The escrow has not yet expired (lazy expiry path called too early).
    #[error("OS_ERR_305: Escrow not yet expired: {0}")]
    NotYetExpired(EscrowId),

    /// A dispute deadline has already passed.
    #[error("OS_ERR_306: Deadline passed for {0}")]
    DeadlinePassed(DisputeId),

    /// A dispute deadline has not been reached yet.
    #[error("OS_ERR_307: Deadline not reached for {0}")]
    DeadlineNotReached(DisputeId),

    /// The escrow already has its (single, lifetime) dispute.
    #[error("OS_ERR_308: Escrow already disputed: {0}")]
    AlreadyDisputed(EscrowId),

    // =================================================================
    // Dispute / Stake Errors (4xx)
    // =================================================================
    /// The posted dispute stake is below the required amount.
    #[error("OS_ERR_400: Insufficient stake: required {required}, posted {posted}")]
    InsufficientStake { required: String, posted: String },

    /// The counter-stake does not match the disputer's stake.
    #[error("OS_ERR_401: Counter-stake mismatch: required {required}, posted {posted}")]
    CounterStakeMismatch { required: String, posted: String },

    /// The revealed seed does not hash to the committed value.
    #[error("OS_ERR_402: Seed does not match commitment")]
    CommitmentMismatch,

    /// The voter is not a member of this dispute's panel.
    #[error("OS_ERR_403: Not on panel: {0}")]
    NotOnPanel(AccountId),

    /// The panel member has already voted on this dispute.
    #[error("OS_ERR_404: Already voted: {0}")]
    AlreadyVoted(AccountId),

    /// The dispute already reached quorum; no further votes are accepted.
    #[error("OS_ERR_405: Quorum already reached for {0}")]
    QuorumReached(DisputeId),

    // =================================================================
    // Arbitrator Registry Errors (5xx)
    // =================================================================
    /// Not enough active arbitrators to seat a panel.
    #[error("OS_ERR_500: Arbitrators unavailable: need {needed}, have {available}")]
    ArbitratorUnavailable { needed: usize, available: usize },

    /// The account is already registered as an arbitrator.
    #[error("OS_ERR_501: Arbitrator already registered: {0}")]
    ArbitratorExists(AccountId),

    /// The account is not a registered arbitrator.
    #[error("OS_ERR_502: Arbitrator not found: {0}")]
    ArbitratorNotFound(AccountId),

    /// The arbitrator has assigned disputes and cannot exit or withdraw.
    #[error("OS_ERR_503: Arbitrator {account} busy with {assigned} assigned dispute(s)")]
    ArbitratorBusy { account: AccountId, assigned: u32 },

    /// The registry is at its configured maximum size.
    #[error("OS_ERR_504: Arbitrator registry full (max {max})")]
    RegistryFull { max: usize },

    // =================================================================
    // Ledger / Balance Errors (6xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("OS_ERR_600: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: String, available: String },

    /// The referenced custody lock does not exist.
    #[error("OS_ERR_601: Lock not found: {0}")]
    LockNotFound(LockId),

    /// Checked amount arithmetic overflowed or underflowed.
    #[error("OS_ERR_602: Amount arithmetic overflow")]
    AmountOverflow,

    /// Supply conservation invariant violated — critical safety alert.
    #[error("OS_ERR_603: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error (engine bookkeeping out of sync).
    #[error("OS_ERR_900: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SettleError>;

impl SettleError {
    /// Convenience constructor for [`SettleError::NotAuthorized`].
    #[must_use]
    pub fn not_authorized(reason: impl Into<String>) -> Self {
        Self::NotAuthorized {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`SettleError::InvalidState`].
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = SettleError::EscrowNotFound(EscrowId(9));
        let msg = format!("{err}");
        assert!(msg.starts_with("OS_ERR_302"), "Got: {msg}");
    }

    #[test]
    fn insufficient_balance_display() {
        let err = SettleError::InsufficientBalance {
            needed: "100".into(),
            available: "50".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("OS_ERR_600"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn all_errors_have_os_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(SettleError::SelfDealing),
            Box::new(SettleError::AlreadyResolved(EscrowId(1))),
            Box::new(SettleError::CommitmentMismatch),
            Box::new(SettleError::QuorumReached(DisputeId(2))),
            Box::new(SettleError::RegistryFull { max: 64 }),
            Box::new(SettleError::AmountOverflow),
            Box::new(SettleError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("OS_ERR_"),
                "Error missing OS_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn convenience_constructors() {
        let err = SettleError::not_authorized("seller cannot release");
        assert!(matches!(err, SettleError::NotAuthorized { .. }));
        let err = SettleError::invalid_state("escrow is DISPUTED");
        assert!(matches!(err, SettleError::InvalidState { .. }));
    }
}
