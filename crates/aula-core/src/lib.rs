//! Aula Core - non-uniform partitioned convolution for real-time reverb
//!
//! This crate convolves a live mono signal with a long impulse response inside
//! a fixed per-block deadline:
//!
//! - [`partition`] - Split an impulse into paired blocks of doubling length
//! - [`spectral`] - Precomputed block spectra and transform plans
//! - [`ring`] - Input history appended once per cycle
//! - [`accumulator`] - Overlap-add output buffer
//! - [`cycle`] - Cycle counter that decides which blocks run
//! - [`task`] - Per-block convolution work items
//! - [`engine`] - The cycle driver, worker pool and merge timeline
//! - [`overload`] - Output level guard and forced reset
//! - [`controls`] - Lock-free parameters and the input spectrum monitor
//!
//! ## Latency
//!
//! The dry path passes through with no delay. The wet path lags the input by
//! exactly one minimum block.
//!
//! ## Example
//!
//! ```rust,ignore
//! use aula_core::{AudioBuffer, Engine, EngineConfig};
//!
//! let impulse = AudioBuffer::mono(48000, impulse_samples).zero_padded_to_power_of_two(0);
//! let mut engine = Engine::new(EngineConfig::default(), &impulse)?;
//!
//! let mut out = vec![0.0; engine.block_size() * engine.channels()];
//! engine.process_block(&input_block, &mut out)?;
//! ```

pub mod accumulator;
pub mod buffer;
pub mod controls;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod fft;
pub mod generation;
pub mod overload;
pub mod partition;
pub mod ring;
pub mod spectral;
pub mod stats;
pub mod task;

mod pool;
mod timeline;

pub use accumulator::OutputAccumulator;
pub use buffer::AudioBuffer;
pub use controls::{AtomicParam, EngineControls, SpectrumMonitor};
pub use cycle::CycleCounter;
pub use engine::{
    CycleOutcome, DEFAULT_OVERLOAD_THRESHOLD, Engine, EngineConfig, ImpulseLoader,
    PreparedGeneration,
};
pub use error::{Error, Result};
pub use fft::{Fft, FftSet, hann, magnitudes};
pub use generation::{CancellationToken, Generation};
pub use overload::{OverloadBreaker, Verdict};
pub use partition::{BlockLengthPlan, DEFAULT_BLOCK_SIZE, MIN_BLOCK_SIZE, Parity, PlanEntry};
pub use pool::default_worker_count;
pub use ring::InputHistoryRing;
pub use spectral::SpectralBlockStore;
pub use stats::EngineStats;
pub use task::{ConvolutionTask, TaskResult};
