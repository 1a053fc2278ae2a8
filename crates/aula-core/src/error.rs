//! Error types for impulse preparation and engine operation.

use thiserror::Error;

use crate::partition::MIN_BLOCK_SIZE;

/// Errors raised while preparing impulse data or driving the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Only mono and stereo buffers are supported.
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    InvalidChannelCount(usize),

    /// Stereo channels must hold the same number of frames.
    #[error("channel length mismatch: left has {left} frames, right has {right}")]
    ChannelLengthMismatch {
        /// Frames in the first channel.
        left: usize,
        /// Frames in the second channel.
        right: usize,
    },

    /// The impulse holds no frames at all.
    #[error("impulse has no frames")]
    EmptyImpulse,

    /// Partitioning requires a power-of-two frame count.
    #[error("frame count {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// The minimum block size must be a power of two.
    #[error("block size {0} must be a power of two of at least {MIN_BLOCK_SIZE}")]
    InvalidBlockSize(usize),

    /// The impulse is too short to yield a single pair of blocks.
    #[error(
        "impulse of {frames} frames is shorter than the {min} frames required by block size {block_size}"
    )]
    ImpulseTooShort {
        /// Frames in the impulse.
        frames: usize,
        /// Minimum frames required (four blocks).
        min: usize,
        /// Minimum block size in use.
        block_size: usize,
    },

    /// A cycle buffer did not match the engine's block layout.
    #[error("buffer holds {actual} samples, expected {expected}")]
    BlockSizeMismatch {
        /// Samples the engine expects for one cycle.
        expected: usize,
        /// Samples actually supplied.
        actual: usize,
    },

    /// Reserving sample storage failed.
    #[error("failed to allocate {0} samples")]
    Allocation(usize),

    /// A worker or merge thread could not be started.
    #[error("failed to spawn engine thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The engine has shut down and no longer accepts work.
    #[error("engine has stopped")]
    EngineStopped,
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reserve exactly `len` zeroed samples, reporting exhaustion as an error.
pub(crate) fn try_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation(len))?;
    buffer.resize(len, T::default());
    Ok(buffer)
}
