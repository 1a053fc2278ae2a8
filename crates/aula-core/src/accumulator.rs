//! Overlap-add output buffer.

use crate::error::try_zeroed;
use crate::{Error, Result};

/// Per-channel sum of task results awaiting output.
///
/// Index 0 is the block played by the next completed cycle. Results are
/// always added, never written, so merges commute.
#[derive(Debug, Clone)]
pub struct OutputAccumulator {
    channels: Vec<Vec<f32>>,
    block_size: usize,
}

impl OutputAccumulator {
    /// Allocate `channels` silent buffers of `len` samples each.
    pub fn new(channels: usize, len: usize, block_size: usize) -> Result<Self> {
        if !(1..=2).contains(&channels) {
            return Err(Error::InvalidChannelCount(channels));
        }
        if block_size == 0 || len < block_size {
            return Err(Error::BlockSizeMismatch {
                expected: block_size,
                actual: len,
            });
        }
        let channels = (0..channels)
            .map(|_| try_zeroed(len))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            channels,
            block_size,
        })
    }

    /// Number of output channels.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Always false; the accumulator holds at least one block.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add `samples` into `channel` starting at `offset`.
    ///
    /// Samples past the end of the buffer are discarded.
    pub fn add(&mut self, channel: usize, offset: usize, samples: &[f32]) {
        let Some(buffer) = self.channels.get_mut(channel) else {
            return;
        };
        if offset >= buffer.len() {
            return;
        }
        for (slot, &x) in buffer[offset..].iter_mut().zip(samples) {
            *slot += x;
        }
    }

    /// The next block of `channel`.
    pub fn head(&self, channel: usize) -> &[f32] {
        &self.channels[channel][..self.block_size]
    }

    /// Drop the head block and append a silent block.
    pub fn shift(&mut self) {
        let b = self.block_size;
        for buffer in &mut self.channels {
            buffer.copy_within(b.., 0);
            let tail = buffer.len() - b;
            buffer[tail..].fill(0.0);
        }
    }

    /// Reset every channel to silence.
    pub fn clear(&mut self) {
        for buffer in &mut self.channels {
            buffer.fill(0.0);
        }
    }

    /// Full contents of `channel`.
    pub fn as_slice(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }
}
