//! Audio I/O for the Aula convolution engine.
//!
//! This crate provides:
//!
//! - **Impulse assets**: [`read_impulse`] loads a WAV impulse, validated and
//!   zero-padded for the partitioner; [`read_audio`] loads it untouched for
//!   synthesis; [`write_impulse`] saves one as 32-bit float
//! - **Real-time streaming**: [`DuplexStream`] captures the input device and
//!   drives the engine in fixed-size cycles through a [`Reblocker`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aula_core::{Engine, EngineConfig};
//! use aula_io::{DuplexConfig, DuplexStream, read_impulse};
//!
//! let config = EngineConfig::default();
//! let impulse = read_impulse("church.wav", 4 * config.block_size)?;
//! let mut engine = Engine::new(config, &impulse)?;
//!
//! let mut stream = DuplexStream::new(DuplexConfig::default())?;
//! stream.run(move |input, output| {
//!     let _ = engine.process_block(input, output);
//! })?;
//! ```

mod reblock;
mod stream;
mod wav;

pub use reblock::Reblocker;
pub use stream::{AudioDevice, DuplexConfig, DuplexStream, default_device, list_devices};
pub use wav::{WavFormat, WavInfo, read_audio, read_impulse, read_wav_info, write_impulse};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The decoded samples do not form a valid impulse.
    #[error("Invalid impulse: {0}")]
    Core(#[from] aula_core::Error),

    /// The file decoded to zero frames.
    #[error("Audio file contains no frames")]
    Empty,

    /// Only mono and stereo files are accepted.
    #[error("Unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u16),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
