//! The full synthesis pipeline.
//!
//! Per channel: analyze the recording into block spectra, fit (or take from
//! an edit) one decay curve per bin, shape white noise with those curves,
//! match the recording's amplitude envelope and splice the recorded onset
//! back in. The result is normalized to a peak of 1.

use aula_core::{AudioBuffer, Fft};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::crossfade::crossfade_onset;
use crate::decay::{DecayEdit, DecayEnvelope};
use crate::envelope::{AmplitudeEnvelope, EnvelopeShaping};
use crate::noise::shaped_noise;
use crate::spectrogram::MagnitudeSpectrogram;
use crate::{Error, Result};

/// Default analysis block length.
pub const DEFAULT_ANALYSIS_BLOCK: usize = 1024;

/// Default amplitude envelope block length.
pub const DEFAULT_ENVELOPE_BLOCK: usize = 256;

/// Synthesis parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Spectrogram block length `S` (power of two).
    pub analysis_block: usize,
    /// Amplitude envelope block length.
    pub envelope_block: usize,
    /// Samples copied verbatim from the recording.
    pub crossover_point: usize,
    /// Length of the blend after the crossover point.
    pub crossover_length: usize,
    /// Requested impulse length; rounded up to a power of two.
    pub target_frames: usize,
    /// Noise seed; channel `c` uses `seed + c`.
    pub seed: u64,
    /// Amplitude envelope application.
    pub envelope_shaping: EnvelopeShaping,
    /// Sample rate used when there is no recording.
    pub sample_rate: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            analysis_block: DEFAULT_ANALYSIS_BLOCK,
            envelope_block: DEFAULT_ENVELOPE_BLOCK,
            crossover_point: 2048,
            crossover_length: 4096,
            target_frames: 131072,
            seed: 1,
            envelope_shaping: EnvelopeShaping::PeakOnly,
            sample_rate: 44100,
        }
    }
}

impl SynthesisConfig {
    /// Check block sizes.
    pub fn validate(&self) -> Result<()> {
        if self.analysis_block < 2 || !self.analysis_block.is_power_of_two() {
            return Err(Error::InvalidAnalysisBlock(self.analysis_block));
        }
        if self.envelope_block == 0 {
            return Err(Error::InvalidEnvelopeBlock);
        }
        Ok(())
    }

    /// Frequency bins per analysis block (`analysis_block + 1`).
    pub fn bins(&self) -> usize {
        self.analysis_block + 1
    }

    /// Output length: the target rounded up to a power of two, at least two
    /// analysis blocks.
    pub fn output_frames(&self) -> usize {
        self.target_frames
            .max(2 * self.analysis_block)
            .next_power_of_two()
    }
}

/// A synthesized impulse and the curves it was built from.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Peak-normalized impulse.
    pub impulse: AudioBuffer,
    /// Decay curves, one envelope per channel.
    pub decay: Vec<DecayEnvelope>,
    /// Magnitude mapped to a normalized value of 1.
    pub reference: f32,
}

impl Synthesis {
    /// Normalized endpoints of the first channel's curves, for display.
    pub fn decay_display(&self) -> Option<DecayEdit> {
        self.decay.first().map(|d| d.to_edit(self.reference))
    }
}

/// Runs the synthesis pipeline.
#[derive(Debug, Clone)]
pub struct ImpulseSynthesizer {
    config: SynthesisConfig,
    fft: Fft,
}

impl ImpulseSynthesizer {
    /// Synthesizer with validated parameters.
    pub fn new(config: SynthesisConfig) -> Result<Self> {
        config.validate()?;
        let fft = Fft::new(2 * config.analysis_block);
        Ok(Self { config, fft })
    }

    /// Parameters in use.
    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Change the crossover region.
    pub fn set_crossover(&mut self, point: usize, length: usize) {
        self.config.crossover_point = point;
        self.config.crossover_length = length;
    }

    /// Change the requested length.
    pub fn set_target_frames(&mut self, frames: usize) {
        self.config.target_frames = frames;
    }

    /// Synthesize from a recording, an edited curve, or both.
    ///
    /// An edit overrides the fitted curves. Without a recording an edit is
    /// required and the output is mono with a reference magnitude of 1.
    pub fn synthesize(
        &self,
        recording: Option<&AudioBuffer>,
        edit: Option<&DecayEdit>,
    ) -> Result<Synthesis> {
        let s = self.config.analysis_block;
        let frames = self.config.output_frames();
        let blocks = frames / s;
        if let Some(edit) = edit {
            edit.validate(self.config.bins())?;
        }

        let Some(recording) = recording else {
            let edit = edit.ok_or(Error::MissingDecayCurve)?;
            let envelope = DecayEnvelope::from_edit(edit, 1.0, blocks);
            let mut rng = StdRng::seed_from_u64(self.config.seed);
            let samples = shaped_noise(&envelope, frames, s, &self.fft, &mut rng);
            let mut impulse = AudioBuffer::mono(self.config.sample_rate, samples);
            impulse.normalize_peak(1.0);
            tracing::info!(frames, "impulse synthesized from edited curve");
            return Ok(Synthesis {
                impulse,
                decay: vec![envelope],
                reference: 1.0,
            });
        };

        let original_frames = recording.frame_count();
        let fit_blocks = original_frames.div_ceil(s);
        let fitted: Vec<DecayEnvelope> = recording
            .iter_channels()
            .map(|channel| {
                let padded_len = channel.len().max(s).next_power_of_two();
                let mut padded = channel.to_vec();
                padded.resize(padded_len, 0.0);
                let spectrogram = MagnitudeSpectrogram::analyze(&padded, s, &self.fft);
                DecayEnvelope::fit(&spectrogram, fit_blocks, blocks)
            })
            .collect();
        let reference = fitted
            .iter()
            .map(DecayEnvelope::reference)
            .fold(0.0f32, f32::max);
        let reference = if reference > 0.0 { reference } else { 1.0 };

        let decay: Vec<DecayEnvelope> = match edit {
            Some(edit) => (0..recording.channels())
                .map(|_| DecayEnvelope::from_edit(edit, reference, blocks))
                .collect(),
            None => fitted,
        };

        let mut channels = Vec::with_capacity(recording.channels());
        for (c, (original, envelope)) in recording.iter_channels().zip(&decay).enumerate() {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(c as u64));
            let mut samples = shaped_noise(envelope, frames, s, &self.fft, &mut rng);

            let amplitude = AmplitudeEnvelope::fit(original, self.config.envelope_block);
            amplitude.apply(
                &mut samples,
                self.config.envelope_block,
                self.config.envelope_shaping,
            );

            crossfade_onset(
                &mut samples,
                original,
                self.config.crossover_point,
                self.config.crossover_length,
            );
            channels.push(samples);
        }

        let mut impulse = AudioBuffer::new(recording.sample_rate(), channels)?;
        impulse.normalize_peak(1.0);

        tracing::info!(
            frames,
            channels = impulse.channels(),
            fit_blocks,
            edited = edit.is_some(),
            "impulse synthesized"
        );

        Ok(Synthesis {
            impulse,
            decay,
            reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SynthesisConfig {
        SynthesisConfig {
            analysis_block: 64,
            envelope_block: 32,
            crossover_point: 128,
            crossover_length: 256,
            target_frames: 3000,
            seed: 3,
            ..SynthesisConfig::default()
        }
    }

    fn decaying_recording(frames: usize) -> AudioBuffer {
        let samples = (0..frames)
            .map(|n| (-(n as f32) / 400.0).exp() * ((n as f32) * 0.37).sin())
            .collect();
        AudioBuffer::mono(48000, samples)
    }

    #[test]
    fn output_length_is_power_of_two() {
        let config = small_config();
        assert_eq!(config.output_frames(), 4096);
        let synth = ImpulseSynthesizer::new(config).unwrap();
        let result = synth.synthesize(Some(&decaying_recording(2000)), None).unwrap();
        assert_eq!(result.impulse.frame_count(), 4096);
        assert!((result.impulse.peak() - 1.0).abs() < 1e-5);
        assert_eq!(result.decay.len(), 1);
        assert_eq!(result.decay[0].num_bins(), 65);
        assert_eq!(result.decay[0].num_blocks(), 64);
    }

    #[test]
    fn onset_matches_recording_shape() {
        let recording = decaying_recording(2000);
        let synth = ImpulseSynthesizer::new(small_config()).unwrap();
        let result = synth.synthesize(Some(&recording), None).unwrap();
        // The onset is copied verbatim, then scaled by the final normalization.
        let out = result.impulse.channel(0);
        let ratio = out[10] / recording.channel(0)[10];
        for n in 11..128 {
            let expected = recording.channel(0)[n] * ratio;
            assert!((out[n] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn requires_curve_without_recording() {
        let synth = ImpulseSynthesizer::new(small_config()).unwrap();
        assert!(matches!(
            synth.synthesize(None, None),
            Err(Error::MissingDecayCurve)
        ));
        let edit = DecayEdit::uniform(65, 0.9, 0.3);
        let result = synth.synthesize(None, Some(&edit)).unwrap();
        assert_eq!(result.impulse.channels(), 1);
        assert_eq!(result.impulse.frame_count(), 4096);
        assert!((result.impulse.peak() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rejects_wrong_edit_length() {
        let synth = ImpulseSynthesizer::new(small_config()).unwrap();
        let edit = DecayEdit::uniform(10, 1.0, 0.5);
        assert!(matches!(
            synth.synthesize(Some(&decaying_recording(512)), Some(&edit)),
            Err(Error::DecayEditLength { expected: 65, actual: 10 })
        ));
    }

    #[test]
    fn stereo_channels_use_distinct_noise() {
        let left = decaying_recording(1000).into_channels().remove(0);
        let recording = AudioBuffer::stereo(48000, left.clone(), left).unwrap();
        let config = SynthesisConfig {
            crossover_point: 0,
            crossover_length: 0,
            ..small_config()
        };
        let result = ImpulseSynthesizer::new(config)
            .unwrap()
            .synthesize(Some(&recording), None)
            .unwrap();
        assert_eq!(result.impulse.channels(), 2);
        assert_ne!(result.impulse.channel(0), result.impulse.channel(1));
    }

    #[test]
    fn rejects_bad_analysis_block() {
        let config = SynthesisConfig {
            analysis_block: 100,
            ..SynthesisConfig::default()
        };
        assert!(matches!(
            ImpulseSynthesizer::new(config),
            Err(Error::InvalidAnalysisBlock(100))
        ));
    }
}
