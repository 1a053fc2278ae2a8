//! Block magnitude spectra of an impulse.

use aula_core::{Fft, magnitudes};

/// Magnitude of each analysis block, `[block][bin]`.
///
/// Each block of `block_size` samples is zero-padded to `2 · block_size`
/// before the transform, so bins run `0..=block_size`.
#[derive(Debug, Clone)]
pub struct MagnitudeSpectrogram {
    /// Magnitudes, `[block][bin]`.
    pub data: Vec<Vec<f32>>,
    /// Samples per analysis block.
    pub block_size: usize,
}

impl MagnitudeSpectrogram {
    /// Analyze `samples` in consecutive blocks.
    ///
    /// A trailing partial block is zero-filled.
    pub fn analyze(samples: &[f32], block_size: usize, fft: &Fft) -> Self {
        debug_assert_eq!(fft.size(), 2 * block_size);
        let data = samples
            .chunks(block_size)
            .map(|block| {
                let spectrum = fft.forward_real(block);
                magnitudes(&spectrum[..=block_size])
            })
            .collect();
        Self { data, block_size }
    }

    /// Number of analysis blocks.
    pub fn num_blocks(&self) -> usize {
        self.data.len()
    }

    /// Bins per block (`block_size + 1`).
    pub fn num_bins(&self) -> usize {
        self.block_size + 1
    }

    /// Magnitude at `block`, `bin`.
    pub fn get(&self, block: usize, bin: usize) -> Option<f32> {
        self.data.get(block).and_then(|b| b.get(bin)).copied()
    }

    /// Magnitudes of one bin across the first `blocks` blocks.
    pub fn bin_over_time(&self, bin: usize, blocks: usize) -> Vec<f32> {
        self.data
            .iter()
            .take(blocks)
            .filter_map(|block| block.get(bin).copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_and_bin_counts() {
        let fft = Fft::new(64);
        let spec = MagnitudeSpectrogram::analyze(&[0.0; 100], 32, &fft);
        assert_eq!(spec.num_blocks(), 4);
        assert_eq!(spec.num_bins(), 33);
        assert!(spec.data.iter().all(|b| b.len() == 33));
    }

    #[test]
    fn impulse_gives_flat_first_block() {
        let mut samples = vec![0.0; 64];
        samples[0] = 0.5;
        let spec = MagnitudeSpectrogram::analyze(&samples, 32, &Fft::new(64));
        for bin in 0..33 {
            assert!((spec.get(0, bin).unwrap() - 0.5).abs() < 1e-5);
            assert!(spec.get(1, bin).unwrap() < 1e-6);
        }
        assert_eq!(spec.bin_over_time(3, 1).len(), 1);
    }

    #[test]
    fn tone_peaks_in_its_bin() {
        // Four cycles per 32 samples lands on bin 8 of the 64-point transform.
        let samples: Vec<f32> = (0..32)
            .map(|n| (2.0 * std::f32::consts::PI * 4.0 * n as f32 / 32.0).sin())
            .collect();
        let spec = MagnitudeSpectrogram::analyze(&samples, 32, &Fft::new(64));
        let row = &spec.data[0];
        let peak = (0..row.len()).max_by(|&a, &b| row[a].total_cmp(&row[b]));
        assert_eq!(peak, Some(8));
    }
}
