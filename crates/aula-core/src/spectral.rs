//! Precomputed impulse block spectra.

use rustfft::num_complex::Complex;

use crate::error::try_zeroed;
use crate::fft::{Fft, FftSet};
use crate::partition::{BlockLengthPlan, PlanEntry};
use crate::{AudioBuffer, Error, Result};

/// Frequency-domain impulse blocks for every plan entry and channel.
///
/// Built once per impulse load and shared read-only with every task of the
/// generation. Also carries the transform plans for each block size so that
/// workers never plan on the hot path.
#[derive(Debug)]
pub struct SpectralBlockStore {
    plan: BlockLengthPlan,
    sample_rate: u32,
    // spectra[channel][entry]
    spectra: Vec<Vec<Vec<Complex<f32>>>>,
    ffts: FftSet,
}

impl SpectralBlockStore {
    /// Partition `impulse` with minimum block `block_size` and transform each
    /// block.
    pub fn build(impulse: &AudioBuffer, block_size: usize) -> Result<Self> {
        let plan = BlockLengthPlan::for_impulse(impulse, block_size)?;
        Self::with_plan(impulse, plan)
    }

    /// Transform `impulse` according to an existing plan.
    pub fn with_plan(impulse: &AudioBuffer, plan: BlockLengthPlan) -> Result<Self> {
        if impulse.frame_count() != plan.frame_count() {
            return Err(Error::BlockSizeMismatch {
                expected: plan.frame_count(),
                actual: impulse.frame_count(),
            });
        }

        let ffts = FftSet::plan(plan.entries().iter().map(PlanEntry::fft_size));

        let mut spectra = Vec::with_capacity(impulse.channels());
        for channel in impulse.iter_channels() {
            let mut blocks = Vec::with_capacity(plan.entry_count());
            for (entry, samples) in plan.blocks(channel) {
                let fft = transform_for(&ffts, entry)?;
                let mut buffer = try_zeroed::<Complex<f32>>(entry.fft_size())?;
                for (slot, &s) in buffer.iter_mut().zip(samples) {
                    slot.re = s;
                }
                fft.forward_complex(&mut buffer);
                blocks.push(buffer);
            }
            spectra.push(blocks);
        }

        tracing::debug!(
            channels = impulse.channels(),
            entries = plan.entry_count(),
            sizes = ?ffts.sizes().collect::<Vec<_>>(),
            "spectral block store built"
        );

        Ok(Self {
            plan,
            sample_rate: impulse.sample_rate(),
            spectra,
            ffts,
        })
    }

    /// Partition plan the spectra were computed from.
    pub fn plan(&self) -> &BlockLengthPlan {
        &self.plan
    }

    /// Number of impulse channels.
    pub fn channels(&self) -> usize {
        self.spectra.len()
    }

    /// Sample rate of the source impulse.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Spectrum of 1-based block `index` for `channel`.
    pub fn spectrum(&self, channel: usize, index: usize) -> Option<&[Complex<f32>]> {
        let blocks = self.spectra.get(channel)?;
        index
            .checked_sub(1)
            .and_then(|i| blocks.get(i))
            .map(Vec::as_slice)
    }

    /// Transform plan of length `size`.
    pub fn fft(&self, size: usize) -> Option<&Fft> {
        self.ffts.get(size)
    }
}

fn transform_for<'a>(ffts: &'a FftSet, entry: &PlanEntry) -> Result<&'a Fft> {
    ffts.get(entry.fft_size())
        .ok_or(Error::InvalidBlockSize(entry.len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_spectrum_per_channel_and_entry() {
        let impulse = AudioBuffer::stereo(48000, vec![0.0; 1024], vec![0.0; 1024]).unwrap();
        let store = SpectralBlockStore::build(&impulse, 64).unwrap();
        assert_eq!(store.channels(), 2);
        assert_eq!(store.plan().entry_count(), 6);
        for channel in 0..2 {
            for entry in store.plan().entries() {
                let spectrum = store.spectrum(channel, entry.index).unwrap();
                assert_eq!(spectrum.len(), 2 * entry.len);
            }
        }
        assert!(store.spectrum(0, 0).is_none());
        assert!(store.spectrum(0, 7).is_none());
        assert!(store.spectrum(2, 1).is_none());
    }

    #[test]
    fn unit_impulse_has_flat_first_spectrum() {
        let mut samples = vec![0.0; 1024];
        samples[0] = 1.0;
        let store = SpectralBlockStore::build(&AudioBuffer::mono(48000, samples), 64).unwrap();
        for bin in store.spectrum(0, 1).unwrap() {
            assert!((bin.re - 1.0).abs() < 1e-5);
            assert!(bin.im.abs() < 1e-5);
        }
        for bin in store.spectrum(0, 2).unwrap() {
            assert!(bin.norm() < 1e-6);
        }
    }

    #[test]
    fn block_spectrum_matches_block_samples() {
        let samples: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.01).sin()).collect();
        let store =
            SpectralBlockStore::build(&AudioBuffer::mono(44100, samples.clone()), 64).unwrap();
        let entry = *store.plan().entry(4).unwrap();
        let mut spectrum = store.spectrum(0, 4).unwrap().to_vec();
        store.fft(entry.fft_size()).unwrap().inverse_complex(&mut spectrum);
        for (i, c) in spectrum.iter().enumerate() {
            let expected = if i < entry.len { samples[entry.offset + i] } else { 0.0 };
            assert!((c.re - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn plans_every_transform_size() {
        let store = SpectralBlockStore::build(&AudioBuffer::mono(48000, vec![0.0; 2048]), 64)
            .unwrap();
        for size in [128, 256, 512, 1024] {
            assert!(store.fft(size).is_some());
        }
    }
}
