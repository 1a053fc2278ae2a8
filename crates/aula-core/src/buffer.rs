//! Owned mono/stereo sample storage.

use crate::{Error, Result};

/// Multi-channel audio owned as one vector per channel.
///
/// Holds one or two channels of equal length. Impulses handed to the engine
/// must additionally have a power-of-two frame count; use
/// [`AudioBuffer::zero_padded_to_power_of_two`] to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    samples: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample vectors.
    pub fn new(sample_rate: u32, samples: Vec<Vec<f32>>) -> Result<Self> {
        match samples.len() {
            1 => {}
            2 => {
                let (left, right) = (samples[0].len(), samples[1].len());
                if left != right {
                    return Err(Error::ChannelLengthMismatch { left, right });
                }
            }
            n => return Err(Error::InvalidChannelCount(n)),
        }
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    /// Build a mono buffer.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples: vec![samples],
        }
    }

    /// Build a stereo buffer from separate left and right channels.
    pub fn stereo(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> Result<Self> {
        Self::new(sample_rate, vec![left, right])
    }

    /// Build a silent buffer.
    pub fn silence(channels: usize, sample_rate: u32, frames: usize) -> Result<Self> {
        Self::new(sample_rate, vec![vec![0.0; frames]; channels])
    }

    /// Number of channels (1 or 2).
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel.
    pub fn frame_count(&self) -> usize {
        self.samples[0].len()
    }

    /// Whether the frame count is a non-zero power of two.
    pub fn is_power_of_two(&self) -> bool {
        self.frame_count().is_power_of_two()
    }

    /// Samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid channel.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Mutable samples of one channel.
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Iterate over channels in order.
    pub fn iter_channels(&self) -> impl Iterator<Item = &[f32]> {
        self.samples.iter().map(Vec::as_slice)
    }

    /// Consume the buffer, returning per-channel vectors.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.samples
    }

    /// Zero-pad every channel to the next power of two no smaller than
    /// `min_frames`.
    pub fn zero_padded_to_power_of_two(mut self, min_frames: usize) -> Self {
        let target = self.frame_count().max(min_frames).max(1).next_power_of_two();
        for channel in &mut self.samples {
            channel.resize(target, 0.0);
        }
        self
    }

    /// Largest absolute sample across all channels.
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    /// Scale so the peak equals `target`. Silent buffers are left untouched.
    pub fn normalize_peak(&mut self, target: f32) {
        let peak = self.peak();
        if peak <= f32::EPSILON {
            return;
        }
        let gain = target / peak;
        for sample in self.samples.iter_mut().flat_map(|c| c.iter_mut()) {
            *sample *= gain;
        }
    }
}
