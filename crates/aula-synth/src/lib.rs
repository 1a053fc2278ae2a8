//! Aula Synth - impulse synthesis for the convolution engine
//!
//! Builds a smooth, extendable impulse from a recorded one (or from an
//! edited decay curve alone):
//!
//! - [`spectrogram`] - Block magnitude spectra
//! - [`fit`] - Log-linear exponential fit
//! - [`decay`] - Per-bin decay curves and the normalized edit format
//! - [`noise`] - White noise shaped by the decay curves
//! - [`envelope`] - Global amplitude envelope
//! - [`crossfade`] - Recorded onset spliced onto the synthesized tail
//! - [`synthesizer`] - The full pipeline
//! - [`reverb`] - Synthesis wired to a running engine

pub mod crossfade;
pub mod decay;
pub mod envelope;
pub mod error;
pub mod fit;
pub mod noise;
pub mod reverb;
pub mod spectrogram;
pub mod synthesizer;

pub use decay::{DECAY_RANGE_DB, DecayEdit, DecayEnvelope};
pub use envelope::{AmplitudeEnvelope, EnvelopeShaping};
pub use error::{Error, Result};
pub use fit::{ExponentialFit, MAGNITUDE_FLOOR};
pub use reverb::{ConvolutionReverb, ImpulseMode, ReverbController};
pub use spectrogram::MagnitudeSpectrogram;
pub use synthesizer::{
    DEFAULT_ANALYSIS_BLOCK, DEFAULT_ENVELOPE_BLOCK, ImpulseSynthesizer, Synthesis,
    SynthesisConfig,
};
