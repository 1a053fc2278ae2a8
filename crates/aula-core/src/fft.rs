//! FFT wrapper and the Hann window

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::sync::Arc;

/// Periodic Hann window (raised cosine) of `size` coefficients.
///
/// Copies overlapped by half the size sum to one.
pub fn hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Planned forward/inverse transform pair of one size.
///
/// Cheap to clone; the plans are shared.
#[derive(Clone)]
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self::with_planner(&mut planner, size)
    }

    fn with_planner(planner: &mut FftPlanner<f32>, size: usize) -> Self {
        Self {
            fft: planner.plan_fft_forward(size),
            ifft: planner.plan_fft_inverse(size),
            size,
        }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex<f32>]) {
        self.fft.process(buffer);
    }

    /// Perform forward FFT on real input, zero-padded to the FFT size.
    ///
    /// Returns the full complex spectrum.
    pub fn forward_real(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> =
            input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));
        self.fft.process(&mut buffer);
        buffer
    }

    /// Perform inverse FFT on complex buffer (in-place)
    pub fn inverse_complex(&self, buffer: &mut [Complex<f32>]) {
        self.ifft.process(buffer);

        // Normalize
        let scale = 1.0 / self.size as f32;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

impl std::fmt::Debug for Fft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft").field("size", &self.size).finish_non_exhaustive()
    }
}

/// Plans for a set of transform sizes, sharing one planner.
#[derive(Debug, Clone, Default)]
pub struct FftSet {
    plans: BTreeMap<usize, Fft>,
}

impl FftSet {
    /// Plan every size in `sizes` (duplicates are planned once).
    pub fn plan(sizes: impl IntoIterator<Item = usize>) -> Self {
        let mut planner = FftPlanner::new();
        let mut plans = BTreeMap::new();
        for size in sizes {
            plans
                .entry(size)
                .or_insert_with(|| Fft::with_planner(&mut planner, size));
        }
        Self { plans }
    }

    /// Plan for `size`, if it was requested at construction.
    pub fn get(&self, size: usize) -> Option<&Fft> {
        self.plans.get(&size)
    }

    /// Planned sizes in ascending order.
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.plans.keys().copied()
    }
}

/// Magnitude of each bin.
pub fn magnitudes(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum.iter().map(|c| c.norm()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_roundtrip() {
        let fft = Fft::new(256);

        let input: Vec<f32> = (0..256)
            .map(|i| (2.0 * PI * 10.0 * i as f32 / 256.0).sin())
            .collect();

        let mut spectrum = fft.forward_real(&input);
        fft.inverse_complex(&mut spectrum);

        for (a, b) in input.iter().zip(spectrum.iter()) {
            assert!((a - b.re).abs() < 1e-4, "Mismatch: {} vs {}", a, b.re);
        }
    }

    #[test]
    fn test_window_hann() {
        let w = hann(100);

        // Hann window should be 0 at the start, 1 at center
        assert!(w[0] < 0.01);
        assert!((w[50] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hann_overlap_sums_to_one() {
        let w = hann(64);
        for i in 0..32 {
            assert!((w[i] + w[i + 32] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fft_set_dedups_sizes() {
        let set = FftSet::plan([64, 128, 64, 256]);
        assert_eq!(set.sizes().collect::<Vec<_>>(), vec![64, 128, 256]);
        assert_eq!(set.get(128).map(Fft::size), Some(128));
        assert!(set.get(512).is_none());
    }

    #[test]
    fn test_dc_detection() {
        let fft = Fft::new(256);
        let spectrum = fft.forward_real(&[1.0; 256]);
        let mags = magnitudes(&spectrum);

        let dc_mag = mags[0];
        let other_mag: f32 = mags[1..].iter().sum();
        assert!(dc_mag > other_mag * 10.0);
    }
}
