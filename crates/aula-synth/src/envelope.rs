//! Global amplitude envelope of an impulse.

use crate::fit::ExponentialFit;

/// How the amplitude envelope is applied to a synthesized impulse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnvelopeShaping {
    /// Match the peak of the fitted envelope only.
    #[default]
    PeakOnly,
    /// Additionally reshape every sample towards the fitted envelope.
    PerSample,
}

/// Block-averaged absolute amplitude, linearly interpolated to one value per
/// sample.
///
/// Block `i` is anchored at sample `i · block`; samples past the last anchor
/// hold its value.
pub fn measure(samples: &[f32], block: usize) -> Vec<f32> {
    let block = block.max(1);
    let anchors: Vec<f32> = samples
        .chunks(block)
        .map(|chunk| chunk.iter().map(|x| x.abs()).sum::<f32>() / chunk.len() as f32)
        .collect();

    (0..samples.len())
        .map(|n| {
            let i = n / block;
            let frac = (n % block) as f32 / block as f32;
            match (anchors.get(i), anchors.get(i + 1)) {
                (Some(&a), Some(&b)) => a + (b - a) * frac,
                (Some(&a), None) => a,
                _ => 0.0,
            }
        })
        .collect()
}

/// Single exponential decay fitted to an impulse's amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeEnvelope {
    fit: ExponentialFit,
}

impl AmplitudeEnvelope {
    /// Fit the measured envelope of `samples`.
    pub fn fit(samples: &[f32], block: usize) -> Self {
        Self {
            fit: ExponentialFit::fit(&measure(samples, block)),
        }
    }

    /// Underlying `A · exp(b · n)` fit, `n` in samples.
    pub fn curve(&self) -> ExponentialFit {
        self.fit
    }

    /// Fitted envelope at sample `n`.
    pub fn at(&self, n: usize) -> f32 {
        self.fit.at(n as f32)
    }

    /// Scale `samples` towards this envelope.
    ///
    /// The buffer is first scaled so that its measured envelope peaks where
    /// the fitted envelope does. With [`EnvelopeShaping::PerSample`] each
    /// sample is then multiplied by the ratio of fitted to measured envelope.
    pub fn apply(&self, samples: &mut [f32], block: usize, shaping: EnvelopeShaping) {
        if samples.is_empty() {
            return;
        }
        let measured = measure(samples, block);
        let measured_peak = measured.iter().fold(0.0f32, |acc, &x| acc.max(x));
        if measured_peak <= f32::EPSILON {
            return;
        }
        let target_peak = self.fit.peak((samples.len() - 1) as f32);
        let gain = target_peak / measured_peak;

        match shaping {
            EnvelopeShaping::PeakOnly => {
                for x in samples.iter_mut() {
                    *x *= gain;
                }
            }
            EnvelopeShaping::PerSample => {
                for (n, (x, &m)) in samples.iter_mut().zip(&measured).enumerate() {
                    if m > f32::EPSILON {
                        *x *= self.at(n) / m;
                    } else {
                        *x *= gain;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_interpolates_between_blocks() {
        let samples = [1.0, -1.0, 0.0, 0.0, 0.5, 0.5];
        let env = measure(&samples, 2);
        assert_eq!(env.len(), 6);
        assert!((env[0] - 1.0).abs() < 1e-6);
        assert!((env[1] - 0.5).abs() < 1e-6);
        assert!((env[2] - 0.0).abs() < 1e-6);
        assert!((env[3] - 0.25).abs() < 1e-6);
        assert!((env[5] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fit_follows_decay() {
        let samples: Vec<f32> = (0..4096)
            .map(|n| (-(n as f32) / 800.0).exp() * if n % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let envelope = AmplitudeEnvelope::fit(&samples, 64);
        let rate = envelope.curve().rate;
        assert!((rate + 1.0 / 800.0).abs() < 1e-4, "rate {rate}");
    }

    #[test]
    fn peak_only_scales_uniformly() {
        let envelope = AmplitudeEnvelope {
            fit: ExponentialFit::flat(0.5),
        };
        let mut samples = vec![1.0, -1.0, 1.0, -1.0];
        envelope.apply(&mut samples, 2, EnvelopeShaping::PeakOnly);
        assert!(samples.iter().all(|x| (x.abs() - 0.5).abs() < 1e-6));
    }

    #[test]
    fn per_sample_follows_target() {
        let envelope = AmplitudeEnvelope {
            fit: ExponentialFit {
                amplitude: 1.0,
                rate: -0.01,
            },
        };
        let mut samples = vec![0.3; 512];
        envelope.apply(&mut samples, 16, EnvelopeShaping::PerSample);
        for n in [0, 100, 400] {
            assert!((samples[n] - envelope.at(n)).abs() < 1e-4);
        }
    }

    #[test]
    fn silence_is_untouched() {
        let envelope = AmplitudeEnvelope {
            fit: ExponentialFit::flat(1.0),
        };
        let mut samples = vec![0.0; 8];
        envelope.apply(&mut samples, 4, EnvelopeShaping::PerSample);
        assert!(samples.iter().all(|&x| x == 0.0));
    }
}
