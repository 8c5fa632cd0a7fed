//! Selection-time entropy for panel drawing.
//!
//! The disputer commits to a seed before knowing this value; panel selection
//! mixes both. Neither side alone can grind the combination.

use rand::RngCore;
use rand::rngs::OsRng;

/// A source of 32 bytes of entropy fixed only at panel-selection time.
pub trait EntropySource: Send + Sync {
    fn draw(&self) -> [u8; 32];
}

/// Operating-system randomness. The production source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn draw(&self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        OsRng.fill_bytes(&mut buf);
        buf
    }
}

/// Fixed entropy for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub [u8; 32]);

impl EntropySource for FixedEntropy {
    fn draw(&self) -> [u8; 32] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_entropy_varies() {
        let src = OsEntropy;
        // Astronomically unlikely to collide.
        assert_ne!(src.draw(), src.draw());
    }

    #[test]
    fn fixed_entropy_is_fixed() {
        let src = FixedEntropy([9u8; 32]);
        assert_eq!(src.draw(), [9u8; 32]);
        assert_eq!(src.draw(), src.draw());
    }
}
