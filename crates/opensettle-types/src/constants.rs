//! System-wide constants for the OpenSettle settlement engine.

/// Basis-point denominator: 10 000 bps == 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default marketplace fee on seller-directed releases (100 bps = 1%).
pub const DEFAULT_MARKETPLACE_FEE_BPS: u32 = 100;

/// Default arbitration fee on disputed resolutions (50 bps = 0.5%).
pub const DEFAULT_ARBITRATION_FEE_BPS: u32 = 50;

/// Default dispute stake, as bps of the escrow amount (10 bps = 0.1%).
pub const DEFAULT_DISPUTE_STAKE_BPS: u32 = 10;

/// Default arbitration panel size. Odd by construction so ties are
/// impossible.
pub const DEFAULT_PANEL_SIZE: usize = 3;

/// Default maximum number of registered arbitrators. Panel selection
/// iterates the registry, so the set stays bounded.
pub const DEFAULT_MAX_ARBITRATORS: usize = 64;

/// Default minimum escrow lifetime in seconds (1 hour). Blocks
/// instant-expiry dust escrows used for dispute spam.
pub const DEFAULT_MIN_ESCROW_DURATION_SECS: u64 = 3_600;

/// Default window for the respondent to post a counter-stake (24 hours).
pub const DEFAULT_COUNTER_STAKE_WINDOW_SECS: u64 = 86_400;

/// Default window for the panel to reach quorum (72 hours).
pub const DEFAULT_VOTING_WINDOW_SECS: u64 = 259_200;

/// Default minimum arbitrator stake, in whole asset units.
pub const DEFAULT_MIN_ARBITRATOR_STAKE_UNITS: u64 = 100;

/// Domain tag for panel-selection entropy mixing.
pub const PANEL_SELECTION_DOMAIN: &[u8] = b"opensettle:panel:v1:";

/// Domain tag for dispute seed commitments.
pub const SEED_COMMITMENT_DOMAIN: &[u8] = b"opensettle:dispute-seed:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenSettle";
