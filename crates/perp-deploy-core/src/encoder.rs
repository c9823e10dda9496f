//! Packed verifier parameters.
//!
//! The Perpetual initializer takes one 256-bit word per verifier slot holding
//! the slot's transaction capacity in the low 248 bits and its tree depth in
//! the top byte. The on-chain decoder hard-codes that split, so the shift is
//! a constant here as well.

use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// Bit offset of the depth byte inside a packed word.
pub const DEPTH_SHIFT: usize = 256 - 8;

/// Errors produced when a capacity or depth does not fit its bit range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingRangeError {
    #[error(
        "capacity and depth lists differ in length: {capacities} capacities, {depths} depth levels"
    )]
    LengthMismatch { capacities: usize, depths: usize },

    #[error("capacity {capacity} at index {index} does not fit below bit 248")]
    CapacityOutOfRange { index: usize, capacity: U256 },

    #[error("depth level {depth} at index {index} exceeds 255")]
    DepthOutOfRange { index: usize, depth: u64 },
}

/// Exclusive upper bound for capacities (`2^248`).
pub fn capacity_limit() -> U256 {
    U256::one() << DEPTH_SHIFT
}

/// A capacity / depth pair that is known to fit a packed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedParameter {
    pub capacity: U256,
    pub depth_levels: u8,
}

impl PackedParameter {
    /// Validate a pair. `index` is only used for error reporting.
    pub fn checked(index: usize, capacity: U256, depth: u64) -> Result<Self, EncodingRangeError> {
        if capacity >= capacity_limit() {
            return Err(EncodingRangeError::CapacityOutOfRange { index, capacity });
        }
        let depth_levels =
            u8::try_from(depth).map_err(|_| EncodingRangeError::DepthOutOfRange { index, depth })?;
        Ok(Self {
            capacity,
            depth_levels,
        })
    }

    /// `capacity + (depth_levels << 248)`.
    pub fn encode(&self) -> U256 {
        self.capacity + (U256::from(self.depth_levels) << DEPTH_SHIFT)
    }

    /// Split a packed word back into capacity (low 248 bits) and depth (top byte).
    pub fn decode(word: U256) -> Self {
        let capacity = word & (capacity_limit() - U256::one());
        let depth_levels = (word >> DEPTH_SHIFT).low_u64() as u8;
        Self {
            capacity,
            depth_levels,
        }
    }
}

/// Pack parallel capacity / depth lists, one word per verifier slot.
///
/// Fails instead of truncating: unequal lengths, a capacity `>= 2^248` or a
/// depth `> 255` all return an [`EncodingRangeError`].
pub fn encode_max_tx_levels(
    capacities: &[U256],
    depth_levels: &[u64],
) -> Result<Vec<U256>, EncodingRangeError> {
    if capacities.len() != depth_levels.len() {
        return Err(EncodingRangeError::LengthMismatch {
            capacities: capacities.len(),
            depths: depth_levels.len(),
        });
    }

    capacities
        .iter()
        .zip(depth_levels)
        .enumerate()
        .map(|(index, (capacity, depth))| {
            PackedParameter::checked(index, *capacity, *depth).map(|p| p.encode())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_default_verifier_table() {
        let capacities = [8u64, 400, 2048].map(U256::from);
        let packed = encode_max_tx_levels(&capacities, &[32, 32, 32]).unwrap();

        let depth = U256::from(32u64) << DEPTH_SHIFT;
        assert_eq!(
            packed,
            vec![
                depth + U256::from(8u64),
                depth + U256::from(400u64),
                depth + U256::from(2048u64)
            ]
        );
    }

    #[test]
    fn zero_depth_leaves_capacity_untouched() {
        let packed = encode_max_tx_levels(&[U256::from(2048u64)], &[0]).unwrap();
        assert_eq!(packed[0], U256::from(2048u64));
    }

    #[test]
    fn max_depth_sets_top_byte() {
        let packed = encode_max_tx_levels(&[U256::zero()], &[255]).unwrap();
        let bytes = {
            let mut buf = [0u8; 32];
            packed[0].to_big_endian(&mut buf);
            buf
        };
        assert_eq!(bytes[0], 0xff);
        assert!(bytes[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn depth_256_is_rejected() {
        let err = encode_max_tx_levels(&[U256::from(8u64)], &[256]).unwrap_err();
        assert_eq!(
            err,
            EncodingRangeError::DepthOutOfRange {
                index: 0,
                depth: 256
            }
        );
    }

    #[test]
    fn capacity_at_limit_is_rejected() {
        let err = encode_max_tx_levels(&[U256::from(1u64), capacity_limit()], &[1, 1]).unwrap_err();
        assert!(matches!(
            err,
            EncodingRangeError::CapacityOutOfRange { index: 1, .. }
        ));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = encode_max_tx_levels(&[U256::from(8u64), U256::from(400u64)], &[32, 32, 32])
            .unwrap_err();
        assert_eq!(
            err,
            EncodingRangeError::LengthMismatch {
                capacities: 2,
                depths: 3
            }
        );
    }

    #[test]
    fn decode_splits_capacity_and_depth() {
        let word = (U256::from(17u64) << DEPTH_SHIFT) + U256::from(400u64);
        let decoded = PackedParameter::decode(word);
        assert_eq!(decoded.capacity, U256::from(400u64));
        assert_eq!(decoded.depth_levels, 17);
    }
}
