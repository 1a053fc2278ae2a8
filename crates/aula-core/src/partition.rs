//! Non-uniform partitioning of an impulse into paired, doubling blocks.
//!
//! For a minimum block length `B` and an impulse of `N` frames, the plan is
//!
//! ```text
//! B, B, 2B, 2B, 4B, 4B, ..., M·B, M·B        with M = (N / B) / 4
//! ```
//!
//! Each size appears twice: the odd member of a pair and the even member that
//! follows it. A pair of size `f·B` is recomputed every `f` cycles, so the
//! per-cycle transform cost stays bounded while the plan spans almost the
//! whole impulse.
//!
//! The doubled series sums to `N − 2B`. The remaining `2B` frames fall past
//! the longest lag the cycle counter can express (`2M` cycles) and are
//! reported by [`BlockLengthPlan::dropped_tail`].

use std::ops::Range;

use crate::{AudioBuffer, Error, Result};

/// Default minimum block length in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Smallest accepted minimum block length.
pub const MIN_BLOCK_SIZE: usize = 16;

/// Position of an entry within its pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// First entry of a pair (block numbers 1, 3, 5, ...).
    Odd,
    /// Second entry of a pair (block numbers 2, 4, 6, ...).
    Even,
}

/// One block of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    /// Block number, starting at 1.
    pub index: usize,
    /// Size multiplier relative to the minimum block length.
    pub factor: usize,
    /// First impulse frame covered by this block.
    pub offset: usize,
    /// Frames in this block (`factor · B`).
    pub len: usize,
    /// Position within the pair.
    pub parity: Parity,
}

impl PlanEntry {
    /// Impulse frames covered by this block.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Cycles between issuing a task for this block and merging its result.
    ///
    /// The even member covers the second half of a doubled segment and lands
    /// one block length of its size later than the odd member.
    pub fn cycles_until_due(&self) -> usize {
        match self.parity {
            Parity::Odd => self.factor - 1,
            Parity::Even => 2 * self.factor - 1,
        }
    }

    /// Divisor applied to this block's output (`len / B`).
    pub fn normalization(&self) -> f32 {
        self.factor as f32
    }

    /// Transform length used for this block (`2 · len`).
    pub fn fft_size(&self) -> usize {
        2 * self.len
    }
}

/// Ordered block lengths for one impulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLengthPlan {
    block_size: usize,
    frame_count: usize,
    max_factor: usize,
    entries: Vec<PlanEntry>,
}

/// Check that `block_size` is a usable minimum block length.
pub fn validate_block_size(block_size: usize) -> Result<()> {
    if block_size < MIN_BLOCK_SIZE || !block_size.is_power_of_two() {
        return Err(Error::InvalidBlockSize(block_size));
    }
    Ok(())
}

impl BlockLengthPlan {
    /// Plan an impulse of `frame_count` frames with minimum block `block_size`.
    pub fn new(frame_count: usize, block_size: usize) -> Result<Self> {
        validate_block_size(block_size)?;
        if frame_count == 0 {
            return Err(Error::EmptyImpulse);
        }
        if !frame_count.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(frame_count));
        }
        let min = 4 * block_size;
        if frame_count < min {
            return Err(Error::ImpulseTooShort {
                frames: frame_count,
                min,
                block_size,
            });
        }

        let num_blocks = frame_count / block_size;
        let max_factor = num_blocks / 4;

        let mut entries = Vec::new();
        let mut offset = 0;
        let mut factor = 1;
        while factor <= max_factor {
            for parity in [Parity::Odd, Parity::Even] {
                let len = factor * block_size;
                entries.push(PlanEntry {
                    index: entries.len() + 1,
                    factor,
                    offset,
                    len,
                    parity,
                });
                offset += len;
            }
            factor *= 2;
        }

        tracing::debug!(
            frame_count,
            block_size,
            max_factor,
            entries = entries.len(),
            "block length plan"
        );

        Ok(Self {
            block_size,
            frame_count,
            max_factor,
            entries,
        })
    }

    /// Plan the given impulse buffer.
    pub fn for_impulse(impulse: &AudioBuffer, block_size: usize) -> Result<Self> {
        Self::new(impulse.frame_count(), block_size)
    }

    /// Minimum block length `B`.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Frames in the planned impulse.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Number of minimum-length blocks in the impulse.
    pub fn num_blocks(&self) -> usize {
        self.frame_count / self.block_size
    }

    /// Largest size multiplier in the plan.
    pub fn max_factor(&self) -> usize {
        self.max_factor
    }

    /// Length of the cycle counter period (`2 · max_factor`).
    pub fn cycle_period(&self) -> usize {
        2 * self.max_factor
    }

    /// Entries in block-number order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Number of entries (always two per factor).
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entry for a 1-based block number.
    pub fn entry(&self, index: usize) -> Option<&PlanEntry> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Size multipliers `1, 2, 4, ..., max_factor`.
    pub fn factors(&self) -> impl Iterator<Item = usize> + use<> {
        let max = self.max_factor;
        std::iter::successors(Some(1usize), |f| Some(f * 2)).take_while(move |&f| f <= max)
    }

    /// The odd and even entries that share `factor`.
    pub fn pair(&self, factor: usize) -> Option<[&PlanEntry; 2]> {
        if !factor.is_power_of_two() || factor > self.max_factor {
            return None;
        }
        let j = factor.trailing_zeros() as usize;
        Some([&self.entries[2 * j], &self.entries[2 * j + 1]])
    }

    /// Frames covered by the entries.
    pub fn covered_frames(&self) -> usize {
        self.entries.iter().map(|e| e.len).sum()
    }

    /// Trailing impulse frames not covered by any entry.
    pub fn dropped_tail(&self) -> usize {
        self.frame_count - self.covered_frames()
    }

    /// Input history length (`frame_count / 4`).
    pub fn history_len(&self) -> usize {
        self.frame_count / 4
    }

    /// Output accumulator length (twice the input history).
    pub fn accumulator_len(&self) -> usize {
        2 * self.history_len()
    }

    /// Split one channel into the contiguous sample runs of each entry.
    pub fn blocks<'a>(
        &'a self,
        channel: &'a [f32],
    ) -> impl Iterator<Item = (&'a PlanEntry, &'a [f32])> + 'a {
        self.entries
            .iter()
            .map(move |entry| (entry, &channel[entry.range()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_for_reference_impulse() {
        let plan = BlockLengthPlan::new(65536, 512).unwrap();
        assert_eq!(plan.max_factor(), 32);
        assert_eq!(plan.entry_count(), 12);
        assert_eq!(plan.cycle_period(), 64);
        let lengths: Vec<usize> = plan.entries().iter().map(|e| e.len).collect();
        assert_eq!(
            lengths,
            vec![512, 512, 1024, 1024, 2048, 2048, 4096, 4096, 8192, 8192, 16384, 16384]
        );
        assert_eq!(plan.covered_frames() + plan.dropped_tail(), 65536);
        assert_eq!(plan.dropped_tail(), 1024);
    }

    #[test]
    fn entries_tile_without_gaps() {
        let plan = BlockLengthPlan::new(8192, 64).unwrap();
        let mut expected_offset = 0;
        for (i, entry) in plan.entries().iter().enumerate() {
            assert_eq!(entry.index, i + 1);
            assert_eq!(entry.offset, expected_offset);
            assert_eq!(entry.len % 64, 0);
            expected_offset += entry.len;
        }
        assert_eq!(expected_offset, plan.covered_frames());
    }

    #[test]
    fn wait_cycles_follow_parity() {
        let plan = BlockLengthPlan::new(4096, 64).unwrap();
        let [odd, even] = plan.pair(4).unwrap();
        assert_eq!(odd.parity, Parity::Odd);
        assert_eq!(even.parity, Parity::Even);
        assert_eq!(odd.cycles_until_due(), 3);
        assert_eq!(even.cycles_until_due(), 7);
        assert_eq!(odd.index, 5);
        assert_eq!(even.index, 6);
    }

    #[test]
    fn factors_are_powers_of_two() {
        let plan = BlockLengthPlan::new(16384, 128).unwrap();
        assert_eq!(plan.factors().collect::<Vec<_>>(), vec![1, 2, 4, 8, 16, 32]);
        assert!(plan.pair(3).is_none());
        assert!(plan.pair(64).is_none());
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            BlockLengthPlan::new(1000, 64),
            Err(Error::NotPowerOfTwo(1000))
        ));
        assert!(matches!(
            BlockLengthPlan::new(1024, 100),
            Err(Error::InvalidBlockSize(100))
        ));
        assert!(matches!(
            BlockLengthPlan::new(128, 64),
            Err(Error::ImpulseTooShort { min: 256, .. })
        ));
        assert!(matches!(BlockLengthPlan::new(0, 64), Err(Error::EmptyImpulse)));
    }

    #[test]
    fn blocks_slice_the_channel() {
        let plan = BlockLengthPlan::new(256, 16).unwrap();
        let channel: Vec<f32> = (0..256).map(|i| i as f32).collect();
        let blocks: Vec<_> = plan.blocks(&channel).collect();
        assert_eq!(blocks.len(), 6);
        assert_eq!(blocks[2].1[0], 32.0);
        assert_eq!(blocks[5].1.len(), 64);
    }
}
