//! Configuration for the settlement engine.
//!
//! Fee recipients are typed share tables resolved once at validation time,
//! not looked up per call; the engine rejects any configuration whose share
//! tables do not sum to exactly 10 000 bps.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, Amount, FeeShare, PlainAmount, Result, SettleError, constants, fees,
};

/// Configuration for one [`SettlementCoordinator`], generic over the amount
/// encoding so the private variant configures a sealed minimum.
///
/// [`SettlementCoordinator`]: https://docs.rs/opensettle-settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SettlementConfig<A: Amount> {
    /// Escrows below this amount are rejected at creation (dust guard).
    pub min_escrow_amount: A,
    /// Escrows shorter-lived than this are rejected at creation.
    pub min_escrow_duration_secs: u64,
    /// Dispute stake each side posts, as bps of the escrow amount.
    pub dispute_stake_bps: u32,
    /// Arbitration fee on disputed resolutions, as bps of the escrow amount.
    /// Charged identically for release and refund outcomes.
    pub arbitration_fee_bps: u32,
    /// Marketplace fee on seller-directed releases, as bps.
    pub marketplace_fee_bps: u32,
    /// Arbitration panel size. Must be odd and at least 3.
    pub panel_size: usize,
    /// Upper bound on registered arbitrators.
    pub max_arbitrators: usize,
    /// Minimum stake to register (and to remain registered after a partial
    /// withdrawal).
    pub min_arbitrator_stake: Decimal,
    /// Respondent's window to post a counter-stake, in seconds.
    pub counter_stake_window_secs: u64,
    /// Panel's window to reach quorum, in seconds.
    pub voting_window_secs: u64,
    /// Marketplace fee split. First entry is primary (absorbs remainder).
    pub marketplace_shares: Vec<FeeShare>,
    /// Arbitration fee split (also used for forfeited stakes).
    pub arbitration_shares: Vec<FeeShare>,
}

impl<A: Amount> SettlementConfig<A> {
    /// Defaults with the given dust minimum, paying all fees to `treasury`.
    ///
    /// Hosts are expected to replace the share tables with their real
    /// schedule; a single-recipient table is the smallest valid one.
    #[must_use]
    pub fn new(min_escrow_amount: A, treasury: AccountId) -> Self {
        Self {
            min_escrow_amount,
            min_escrow_duration_secs: constants::DEFAULT_MIN_ESCROW_DURATION_SECS,
            dispute_stake_bps: constants::DEFAULT_DISPUTE_STAKE_BPS,
            arbitration_fee_bps: constants::DEFAULT_ARBITRATION_FEE_BPS,
            marketplace_fee_bps: constants::DEFAULT_MARKETPLACE_FEE_BPS,
            panel_size: constants::DEFAULT_PANEL_SIZE,
            max_arbitrators: constants::DEFAULT_MAX_ARBITRATORS,
            min_arbitrator_stake: Decimal::from(constants::DEFAULT_MIN_ARBITRATOR_STAKE_UNITS),
            counter_stake_window_secs: constants::DEFAULT_COUNTER_STAKE_WINDOW_SECS,
            voting_window_secs: constants::DEFAULT_VOTING_WINDOW_SECS,
            marketplace_shares: vec![FeeShare::new(treasury, constants::BPS_DENOMINATOR)],
            arbitration_shares: vec![FeeShare::new(treasury, constants::BPS_DENOMINATOR)],
        }
    }

    /// Validate the whole configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.panel_size < 3 || self.panel_size % 2 == 0 {
            return Err(SettleError::InvalidConfig {
                reason: format!("panel_size {} must be odd and >= 3", self.panel_size),
            });
        }
        if self.max_arbitrators < self.panel_size {
            return Err(SettleError::InvalidConfig {
                reason: format!(
                    "max_arbitrators {} below panel_size {}",
                    self.max_arbitrators, self.panel_size
                ),
            });
        }
        for (name, bps) in [
            ("dispute_stake_bps", self.dispute_stake_bps),
            ("arbitration_fee_bps", self.arbitration_fee_bps),
            ("marketplace_fee_bps", self.marketplace_fee_bps),
        ] {
            if bps > constants::BPS_DENOMINATOR {
                return Err(SettleError::InvalidConfig {
                    reason: format!("{name} {bps} exceeds {}", constants::BPS_DENOMINATOR),
                });
            }
        }
        if self.min_escrow_duration_secs == 0 {
            return Err(SettleError::InvalidConfig {
                reason: "min_escrow_duration_secs must be positive".to_string(),
            });
        }
        if self.counter_stake_window_secs == 0 || self.voting_window_secs == 0 {
            return Err(SettleError::InvalidConfig {
                reason: "dispute windows must be positive".to_string(),
            });
        }
        fees::validate_shares(&self.marketplace_shares)?;
        fees::validate_shares(&self.arbitration_shares)?;
        Ok(())
    }

    /// Minimum escrow lifetime as a `chrono` duration.
    #[must_use]
    pub fn min_escrow_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.min_escrow_duration_secs).unwrap_or(i64::MAX))
    }

    /// Counter-stake window as a `chrono` duration.
    #[must_use]
    pub fn counter_stake_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.counter_stake_window_secs).unwrap_or(i64::MAX))
    }

    /// Voting window as a `chrono` duration.
    #[must_use]
    pub fn voting_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.voting_window_secs).unwrap_or(i64::MAX))
    }
}

impl Default for SettlementConfig<PlainAmount> {
    /// Working defaults for a plain public deployment: dust minimum of 100
    /// units, all fees to a freshly generated treasury account.
    fn default() -> Self {
        Self::new(PlainAmount::from(100u64), AccountId::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = SettlementConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.dispute_stake_bps, 10);
        assert_eq!(cfg.panel_size, 3);
    }

    #[test]
    fn even_panel_rejected() {
        let mut cfg = SettlementConfig::default();
        cfg.panel_size = 4;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, SettleError::InvalidConfig { .. }));
    }

    #[test]
    fn tiny_panel_rejected() {
        let mut cfg = SettlementConfig::default();
        cfg.panel_size = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn max_arbitrators_below_panel_rejected() {
        let mut cfg = SettlementConfig::default();
        cfg.max_arbitrators = 2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_fee_bps_rejected() {
        let mut cfg = SettlementConfig::default();
        cfg.marketplace_fee_bps = 10_001;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_share_table_rejected() {
        let mut cfg = SettlementConfig::default();
        cfg.arbitration_shares = vec![FeeShare::new(AccountId::new(), 9_000)];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_windows_rejected() {
        let mut cfg = SettlementConfig::default();
        cfg.voting_window_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duration_helpers() {
        let cfg = SettlementConfig::default();
        assert_eq!(cfg.counter_stake_window(), chrono::Duration::hours(24));
        assert_eq!(cfg.voting_window(), chrono::Duration::hours(72));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = SettlementConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SettlementConfig<PlainAmount> = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
