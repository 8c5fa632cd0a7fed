//! The external identity collaborator.
//!
//! Registration/KYC lives outside this engine; the coordinator only asks
//! one question, and only as optional Sybil-resistance gating on
//! dispute-raising.

use std::collections::HashSet;

use opensettle_types::AccountId;

/// Answers whether an account is registered with the host's identity
/// system.
pub trait IdentityRegistry: Send + Sync {
    fn is_registered(&self, account: AccountId) -> bool;
}

/// A fixed allow-list. Useful for tests and for hosts that sync their
/// registered set in-process.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    accounts: HashSet<AccountId>,
}

impl AllowList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashSet::new(),
        }
    }

    /// Add an account to the allow-list.
    pub fn allow(&mut self, account: AccountId) {
        self.accounts.insert(account);
    }
}

impl IdentityRegistry for AllowList {
    fn is_registered(&self, account: AccountId) -> bool {
        self.accounts.contains(&account)
    }
}
