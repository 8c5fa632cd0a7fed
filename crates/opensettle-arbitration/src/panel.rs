//! Deterministic-but-unpredictable panel selection.
//!
//! The draw is a SHA-256 counter stream over three inputs:
//!
//! 1. the disputer's **seed**, committed before the dispute outcome or the
//!    selection entropy is knowable (commit-reveal),
//! 2. the **selection-time entropy**, fixed only when the panel is drawn,
//! 3. the **dispute id**, so two disputes over the same pool diverge.
//!
//! The disputer cannot grind the seed against entropy they have not seen;
//! the entropy holder cannot grind against a seed they do not know. Given
//! all three inputs the draw replays exactly, so any party can audit a
//! selection after the fact.

use sha2::{Digest, Sha256};

use opensettle_types::{AccountId, DisputeId, Result, SettleError, constants};

use crate::ArbitratorRegistry;

/// Draw `panel_size` distinct arbitrators from the registry, excluding
/// `exclude` (the escrow participants).
///
/// # Errors
/// `ArbitratorUnavailable` if fewer than `panel_size` selectable
/// arbitrators remain after exclusions.
#[allow(clippy::cast_possible_truncation)]
pub fn select_panel(
    registry: &ArbitratorRegistry,
    exclude: &[AccountId],
    panel_size: usize,
    seed: &[u8; 32],
    entropy: &[u8; 32],
    dispute_id: DisputeId,
) -> Result<Vec<AccountId>> {
    let mut candidates = registry.selectable(exclude);
    if candidates.len() < panel_size {
        return Err(SettleError::ArbitratorUnavailable {
            needed: panel_size,
            available: candidates.len(),
        });
    }

    let mut panel = Vec::with_capacity(panel_size);
    for round in 0..panel_size as u64 {
        let mut hasher = Sha256::new();
        hasher.update(constants::PANEL_SELECTION_DOMAIN);
        hasher.update(seed);
        hasher.update(entropy);
        hasher.update(dispute_id.0.to_le_bytes());
        hasher.update(round.to_le_bytes());
        let digest = hasher.finalize();

        let value = u64::from_le_bytes(digest[..8].try_into().expect("SHA-256 yields 32 bytes"));
        // Modulo the shrinking candidate count; the result always indexes
        // in-bounds, so the usize cast cannot truncate meaningfully.
        let pick = (value % candidates.len() as u64) as usize;
        panel.push(candidates.swap_remove(pick));
    }
    Ok(panel)
}
