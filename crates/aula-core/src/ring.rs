//! Most recent input samples, one block appended per cycle.

use std::ops::Range;

use rustfft::num_complex::Complex;

use crate::error::try_zeroed;
use crate::{Error, Result};

/// Sliding window over the most recent input.
///
/// Holds `impulse_len / 4` samples. Each cycle drops the oldest `B` samples
/// and appends `B` new ones at the tail, so the newest sample is always at
/// `len() - 1`.
#[derive(Debug, Clone)]
pub struct InputHistoryRing {
    samples: Vec<f32>,
    block_size: usize,
}

impl InputHistoryRing {
    /// Allocate a silent history of `len` samples fed in blocks of
    /// `block_size`.
    pub fn new(len: usize, block_size: usize) -> Result<Self> {
        if block_size == 0 || len < block_size || len % block_size != 0 {
            return Err(Error::BlockSizeMismatch {
                expected: block_size,
                actual: len,
            });
        }
        Ok(Self {
            samples: try_zeroed(len)?,
            block_size,
        })
    }

    /// History length in samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; a ring holds at least one block.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Block length appended per cycle.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Shift out the oldest block and append `input × gain` at the tail.
    pub fn push_block(&mut self, input: &[f32], gain: f32) -> Result<()> {
        if input.len() != self.block_size {
            return Err(Error::BlockSizeMismatch {
                expected: self.block_size,
                actual: input.len(),
            });
        }
        self.samples.copy_within(self.block_size.., 0);
        let tail = self.samples.len() - self.block_size;
        for (slot, &x) in self.samples[tail..].iter_mut().zip(input) {
            *slot = x * gain;
        }
        Ok(())
    }

    /// Range covering the newest `len` samples.
    pub fn tail_range(&self, len: usize) -> Range<usize> {
        self.samples.len().saturating_sub(len)..self.samples.len()
    }

    /// Copy `range` into a new complex buffer of `padded_len` samples,
    /// zero-filling the remainder.
    pub fn snapshot(&self, range: Range<usize>, padded_len: usize) -> Result<Vec<Complex<f32>>> {
        let mut buffer = try_zeroed::<Complex<f32>>(padded_len)?;
        for (slot, &x) in buffer.iter_mut().zip(&self.samples[range]) {
            slot.re = x;
        }
        Ok(buffer)
    }

    /// Read-only view of the history, oldest first.
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Reset the history to silence.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }
}
