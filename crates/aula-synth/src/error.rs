//! Error types for impulse synthesis.

use thiserror::Error;

/// Errors raised while synthesizing an impulse.
#[derive(Debug, Error)]
pub enum Error {
    /// Buffer or engine error from the core crate.
    #[error(transparent)]
    Core(#[from] aula_core::Error),

    /// Synthesizing without a recording needs an edited decay curve.
    #[error("no recorded impulse and no decay curve to synthesize from")]
    MissingDecayCurve,

    /// A decay edit must hold one value per analysis bin.
    #[error("decay curve has {actual} bins, expected {expected}")]
    DecayEditLength {
        /// Bins the analysis block produces.
        expected: usize,
        /// Bins supplied.
        actual: usize,
    },

    /// Decay edit values are normalized to `[0, 1]`.
    #[error("decay curve value {value} at bin {bin} is outside [0, 1]")]
    DecayValueOutOfRange {
        /// Offending bin.
        bin: usize,
        /// Offending value.
        value: f32,
    },

    /// The analysis block must be a power of two.
    #[error("analysis block {0} must be a power of two of at least 2")]
    InvalidAnalysisBlock(usize),

    /// The envelope block must be non-zero.
    #[error("envelope block must be non-zero")]
    InvalidEnvelopeBlock,
}

/// Convenience result type for synthesis.
pub type Result<T> = std::result::Result<T, Error>;
