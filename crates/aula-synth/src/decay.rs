//! Per-bin decay envelopes and their editable, normalized form.
//!
//! A fitted envelope holds one `A · exp(b · block)` curve per analysis bin.
//! The editor works with a normalized view: each bin's curve is reduced to
//! its value at the first block (`top`) and at the last target block
//! (`bottom`), mapped onto `[0, 1]` over a fixed 120 dB range below a
//! reference magnitude.

use crate::fit::ExponentialFit;
use crate::spectrogram::MagnitudeSpectrogram;
use crate::{Error, Result};

/// Dynamic range covered by normalized decay values.
pub const DECAY_RANGE_DB: f32 = 120.0;

/// Map a normalized value onto a magnitude below `reference`.
pub fn normalized_to_magnitude(value: f32, reference: f32) -> f32 {
    reference * 10f32.powf(DECAY_RANGE_DB * (value - 1.0) / 20.0)
}

/// Map a magnitude onto the normalized scale, clamped to `[0, 1]`.
pub fn magnitude_to_normalized(magnitude: f32, reference: f32) -> f32 {
    if magnitude <= 0.0 || reference <= 0.0 {
        return 0.0;
    }
    (1.0 + 20.0 * (magnitude / reference).log10() / DECAY_RANGE_DB).clamp(0.0, 1.0)
}

/// Hand-edited decay endpoints, one normalized value per bin.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayEdit {
    /// Level at the first block.
    pub top: Vec<f32>,
    /// Level at the last target block.
    pub bottom: Vec<f32>,
}

impl DecayEdit {
    /// Edit with identical endpoints across `bins`.
    pub fn uniform(bins: usize, top: f32, bottom: f32) -> Self {
        Self {
            top: vec![top; bins],
            bottom: vec![bottom; bins],
        }
    }

    /// Number of bins.
    pub fn bins(&self) -> usize {
        self.top.len()
    }

    /// Check that both arrays hold `bins` values in `[0, 1]`.
    pub fn validate(&self, bins: usize) -> Result<()> {
        for len in [self.top.len(), self.bottom.len()] {
            if len != bins {
                return Err(Error::DecayEditLength {
                    expected: bins,
                    actual: len,
                });
            }
        }
        let values = self.top.iter().chain(&self.bottom);
        for (i, &value) in values.enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::DecayValueOutOfRange {
                    bin: i % bins,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Fitted decay curve for every bin over the target block count.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayEnvelope {
    bins: Vec<ExponentialFit>,
    blocks: usize,
}

impl DecayEnvelope {
    /// Fit every bin of `spectrogram` over its first `fit_blocks` blocks and
    /// extend the curves to `target_blocks`.
    pub fn fit(
        spectrogram: &MagnitudeSpectrogram,
        fit_blocks: usize,
        target_blocks: usize,
    ) -> Self {
        let bins = (0..spectrogram.num_bins())
            .map(|bin| ExponentialFit::fit(&spectrogram.bin_over_time(bin, fit_blocks)))
            .collect();
        Self {
            bins,
            blocks: target_blocks,
        }
    }

    /// Curves derived from edited endpoints.
    ///
    /// `reference` is the magnitude that a normalized value of 1 maps to.
    pub fn from_edit(edit: &DecayEdit, reference: f32, target_blocks: usize) -> Self {
        let span = target_blocks.saturating_sub(1);
        let bins = edit
            .top
            .iter()
            .zip(&edit.bottom)
            .map(|(&top, &bottom)| {
                let start = normalized_to_magnitude(top, reference);
                let end = normalized_to_magnitude(bottom, reference);
                let rate = if span == 0 {
                    0.0
                } else {
                    (end / start).ln() / span as f32
                };
                ExponentialFit {
                    amplitude: start,
                    rate: if rate.is_finite() { rate } else { 0.0 },
                }
            })
            .collect();
        Self {
            bins,
            blocks: target_blocks,
        }
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of target blocks the curves span.
    pub fn num_blocks(&self) -> usize {
        self.blocks
    }

    /// Fit of one bin.
    pub fn bin(&self, bin: usize) -> Option<&ExponentialFit> {
        self.bins.get(bin)
    }

    /// Curve value of `bin` at `block`.
    #[inline]
    pub fn magnitude(&self, bin: usize, block: usize) -> f32 {
        self.bins
            .get(bin)
            .map(|fit| fit.at(block as f32))
            .unwrap_or(0.0)
    }

    /// Curve of one bin across all target blocks.
    pub fn curve(&self, bin: usize) -> Vec<f32> {
        (0..self.blocks).map(|block| self.magnitude(bin, block)).collect()
    }

    /// Largest fitted amplitude across bins, used as the normalization
    /// reference.
    pub fn reference(&self) -> f32 {
        self.bins
            .iter()
            .map(|fit| fit.amplitude)
            .fold(0.0f32, f32::max)
    }

    /// Normalized endpoints of the current curves.
    pub fn to_edit(&self, reference: f32) -> DecayEdit {
        let last = self.blocks.saturating_sub(1);
        let (top, bottom) = self
            .bins
            .iter()
            .map(|fit| {
                (
                    magnitude_to_normalized(fit.at(0.0), reference),
                    magnitude_to_normalized(fit.at(last as f32), reference),
                )
            })
            .unzip();
        DecayEdit { top, bottom }
    }
}
