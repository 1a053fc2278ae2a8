//! The cycle driver.
//!
//! [`Engine::process_block`] runs once per block of `B` input frames on the
//! audio thread. It appends the block to the input history, issues the tasks
//! whose factor divides the cycle counter, mixes the accumulator head with the
//! dry input and shifts the accumulator. Convolution work happens on the
//! worker pool; results reach the accumulator through the merge timeline.
//!
//! ```text
//!  driver         pool                merge thread
//!    |--task-------->|                      |
//!    |            compute                   |
//!    |               |--due now: merge      |
//!    |               |--due later: park---->|
//!    |--publish cycle---------------------->|
//!    |                                   merge
//! ```
//!
//! The wet path has a fixed latency of exactly one block.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::accumulator::OutputAccumulator;
use crate::controls::{EngineControls, SpectrumMonitor};
use crate::cycle::CycleCounter;
use crate::generation::Generation;
use crate::overload::{OverloadBreaker, Verdict};
use crate::partition::{BlockLengthPlan, DEFAULT_BLOCK_SIZE, validate_block_size};
use crate::pool::{WorkerPool, default_worker_count};
use crate::ring::InputHistoryRing;
use crate::stats::{EngineStats, StatsCounters};
use crate::task::ConvolutionTask;
use crate::timeline::{Timeline, spawn_merge_thread};
use crate::{AudioBuffer, Error, Result};

/// Default mean absolute output level above which a cycle is silenced.
pub const DEFAULT_OVERLOAD_THRESHOLD: f32 = 0.5;

/// Engine construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum block length `B` (power of two).
    pub block_size: usize,
    /// Stream sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved output channels (1 or 2).
    pub channels: usize,
    /// Initial wet percentage.
    pub mix: f32,
    /// Initial input gain.
    pub input_sensitivity: f32,
    /// Mean absolute output level that silences a cycle.
    pub overload_threshold: f32,
    /// Worker threads; 0 picks one less than the available cores.
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            sample_rate: 44100,
            channels: 2,
            mix: 50.0,
            input_sensitivity: 1.0,
            overload_threshold: DEFAULT_OVERLOAD_THRESHOLD,
            workers: 0,
        }
    }
}

impl EngineConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        validate_block_size(self.block_size)?;
        if !(1..=2).contains(&self.channels) {
            return Err(Error::InvalidChannelCount(self.channels));
        }
        Ok(())
    }

    /// Worker threads to start.
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            default_worker_count()
        } else {
            self.workers
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Output produced normally.
    Normal,
    /// Output exceeded the overload threshold and was silenced.
    Overload,
    /// Sustained overload forced a reset; output silenced, state cleared.
    ForcedReset,
    /// Task buffers could not be allocated; output silenced.
    Aborted,
}

/// A generation with freshly allocated history and accumulator, ready to be
/// swapped in at a cycle boundary.
#[derive(Debug)]
pub struct PreparedGeneration {
    generation: Generation,
    ring: InputHistoryRing,
    accumulator: OutputAccumulator,
}

impl PreparedGeneration {
    /// Partition and transform `impulse`, allocating state for `channels`
    /// outputs.
    pub fn prepare(impulse: &AudioBuffer, block_size: usize, channels: usize) -> Result<Self> {
        Self::from_generation(Generation::build(impulse, block_size)?, channels)
    }

    fn from_generation(generation: Generation, channels: usize) -> Result<Self> {
        let plan = generation.plan();
        let ring = InputHistoryRing::new(plan.history_len(), plan.block_size())?;
        let accumulator =
            OutputAccumulator::new(channels, plan.accumulator_len(), plan.block_size())?;
        Ok(Self {
            generation,
            ring,
            accumulator,
        })
    }

    /// The prepared generation.
    pub fn generation(&self) -> &Generation {
        &self.generation
    }
}

/// Submits impulses to a running engine from any thread.
///
/// Partitioning and transforms run on the caller's thread; the driver swaps
/// the result in at the start of its next cycle.
#[derive(Debug, Clone)]
pub struct ImpulseLoader {
    block_size: usize,
    channels: usize,
    sender: Sender<PreparedGeneration>,
    controls: Arc<EngineControls>,
}

impl ImpulseLoader {
    /// Prepare `impulse` and queue it for installation. Returns the new
    /// generation id.
    pub fn load(&self, impulse: &AudioBuffer) -> Result<u64> {
        let prepared = PreparedGeneration::prepare(impulse, self.block_size, self.channels)?;
        let id = prepared.generation.id();
        self.controls.set_impulse_changing(true);
        self.sender.send(prepared).map_err(|_| {
            self.controls.set_impulse_changing(false);
            Error::EngineStopped
        })?;
        tracing::debug!(generation = id, "impulse queued");
        Ok(id)
    }
}

/// Real-time partitioned convolution engine.
pub struct Engine {
    config: EngineConfig,
    generation: Generation,
    ring: InputHistoryRing,
    counter: CycleCounter,
    cycle: u64,
    breaker: OverloadBreaker,
    timeline: Arc<Timeline>,
    pool: WorkerPool,
    merge_thread: Option<JoinHandle<()>>,
    controls: Arc<EngineControls>,
    monitor: Arc<SpectrumMonitor>,
    stats: Arc<StatsCounters>,
    pending_tx: Sender<PreparedGeneration>,
    pending_rx: Receiver<PreparedGeneration>,
}

impl Engine {
    /// Start an engine convolving with `impulse`.
    pub fn new(config: EngineConfig, impulse: &AudioBuffer) -> Result<Self> {
        config.validate()?;
        if impulse.sample_rate() != config.sample_rate {
            tracing::warn!(
                impulse = impulse.sample_rate(),
                stream = config.sample_rate,
                "impulse sample rate differs from stream; playing without conversion"
            );
        }
        let prepared = PreparedGeneration::prepare(impulse, config.block_size, config.channels)?;
        let PreparedGeneration {
            generation,
            ring,
            accumulator,
        } = prepared;

        let stats = Arc::new(StatsCounters::default());
        let timeline = Arc::new(Timeline::new(accumulator, Arc::clone(&stats)));
        {
            let mut state = timeline.lock();
            timeline.install(&mut state, generation.id());
        }
        stats
            .generation
            .store(generation.id(), Ordering::Relaxed);

        let monitor = SpectrumMonitor::new();
        let pool = WorkerPool::new(config.worker_count(), &timeline, &monitor)?;
        let merge_thread = spawn_merge_thread(Arc::clone(&timeline))?;
        let (pending_tx, pending_rx) = unbounded();

        tracing::info!(
            block_size = config.block_size,
            frames = generation.plan().frame_count(),
            entries = generation.plan().entry_count(),
            channels = config.channels,
            "convolution engine started"
        );

        Ok(Self {
            counter: CycleCounter::new(generation.plan().max_factor()),
            breaker: OverloadBreaker::for_stream(
                config.overload_threshold,
                config.sample_rate,
                config.block_size,
                config.channels,
            ),
            controls: Arc::new(EngineControls::new(config.mix, config.input_sensitivity)),
            config,
            generation,
            ring,
            cycle: 0,
            timeline,
            pool,
            merge_thread: Some(merge_thread),
            monitor,
            stats,
            pending_tx,
            pending_rx,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Minimum block length `B`; also the wet-path latency in frames.
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Interleaved output channels.
    pub fn channels(&self) -> usize {
        self.config.channels
    }

    /// Wet-path latency in frames.
    pub fn latency_frames(&self) -> usize {
        self.config.block_size
    }

    /// Plan of the installed impulse.
    pub fn plan(&self) -> &BlockLengthPlan {
        self.generation.plan()
    }

    /// The installed generation.
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Absolute cycles processed.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current cycle counter value.
    pub fn counter(&self) -> usize {
        self.counter.value()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Shared parameters and flags.
    pub fn controls(&self) -> Arc<EngineControls> {
        Arc::clone(&self.controls)
    }

    /// Smoothed input spectrum published by the first block's tasks.
    pub fn monitor(&self) -> Arc<SpectrumMonitor> {
        Arc::clone(&self.monitor)
    }

    /// Counters since construction.
    pub fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }

    /// Handle for submitting impulses from other threads.
    pub fn loader(&self) -> ImpulseLoader {
        ImpulseLoader {
            block_size: self.config.block_size,
            channels: self.config.channels,
            sender: self.pending_tx.clone(),
            controls: Arc::clone(&self.controls),
        }
    }

    /// Replace the impulse immediately. Not for the audio thread.
    pub fn load_impulse(&mut self, impulse: &AudioBuffer) -> Result<()> {
        let prepared =
            PreparedGeneration::prepare(impulse, self.config.block_size, self.config.channels)?;
        self.install(prepared);
        Ok(())
    }

    /// Wait until every issued task has been merged or dropped.
    ///
    /// Blocks; never call from the audio thread.
    pub fn settle(&self) {
        self.timeline.settle();
    }

    /// Run one cycle: `input` holds `B` mono frames, `output` receives
    /// `B × channels` interleaved frames.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) -> Result<CycleOutcome> {
        let b = self.config.block_size;
        let channels = self.config.channels;
        if input.len() != b {
            return Err(Error::BlockSizeMismatch {
                expected: b,
                actual: input.len(),
            });
        }
        if output.len() != b * channels {
            return Err(Error::BlockSizeMismatch {
                expected: b * channels,
                actual: output.len(),
            });
        }

        self.install_pending();

        let counter = self.counter.advance();
        self.cycle += 1;
        StatsCounters::bump(&self.stats.cycles);

        self.ring
            .push_block(input, self.controls.input_sensitivity())?;

        let aborted = match self.spawn_due_tasks(counter) {
            Ok(()) => false,
            Err(Error::Allocation(len)) => {
                tracing::error!(
                    cycle = self.cycle,
                    len,
                    "task buffer allocation failed; cycle aborted"
                );
                true
            }
            Err(e) => return Err(e),
        };

        let wet = self.controls.mix() / 100.0;
        let dry = 1.0 - wet;
        {
            let mut state = self.timeline.lock();
            for ch in 0..channels {
                let head = state.accumulator.head(ch);
                for (frame, (&w, &x)) in head.iter().zip(input).enumerate() {
                    output[frame * channels + ch] = w * wet + x * dry;
                }
            }
            state.accumulator.shift();
            self.timeline.publish(&mut state, self.cycle);
        }

        if aborted {
            output.fill(0.0);
            StatsCounters::bump(&self.stats.aborted);
            return Ok(CycleOutcome::Aborted);
        }

        match self.breaker.check(output) {
            Verdict::Clean => Ok(CycleOutcome::Normal),
            Verdict::Overloaded => {
                output.fill(0.0);
                StatsCounters::bump(&self.stats.overloads);
                tracing::warn!(
                    cycle = self.cycle,
                    skips = self.breaker.consecutive_skips(),
                    "output overload; cycle silenced"
                );
                Ok(CycleOutcome::Overload)
            }
            Verdict::Tripped => {
                output.fill(0.0);
                StatsCounters::bump(&self.stats.overloads);
                self.force_reset();
                Ok(CycleOutcome::ForcedReset)
            }
        }
    }

    fn spawn_due_tasks(&mut self, counter: usize) -> Result<()> {
        let generation = self.generation.clone();
        let plan = generation.plan();
        for factor in plan.factors() {
            if !self.counter.is_due(factor) {
                continue;
            }
            let Some(pair) = plan.pair(factor) else {
                continue;
            };
            for entry in pair {
                let range = self.ring.tail_range(entry.len);
                let input = self.ring.snapshot(range.clone(), entry.fft_size())?;
                let wait = entry.cycles_until_due();
                let task = ConvolutionTask::new(
                    entry,
                    range,
                    counter,
                    self.counter.target_after(wait),
                    self.cycle + wait as u64,
                    generation.clone(),
                    input,
                );
                self.timeline.task_started();
                if let Err(e) = self.pool.submit(task) {
                    self.timeline.task_skipped();
                    return Err(e);
                }
                StatsCounters::bump(&self.stats.spawned);
                tracing::trace!(block = entry.index, counter, wait, "task issued");
            }
        }
        Ok(())
    }

    fn install_pending(&mut self) {
        let mut latest = None;
        while let Ok(prepared) = self.pending_rx.try_recv() {
            if let Some(skipped) = latest.replace(prepared) {
                tracing::debug!(generation = skipped.generation.id(), "superseded impulse skipped");
            }
        }
        if let Some(prepared) = latest {
            self.install(prepared);
            self.controls.set_impulse_changing(false);
        }
    }

    fn install(&mut self, prepared: PreparedGeneration) {
        let PreparedGeneration {
            generation,
            ring,
            accumulator,
        } = prepared;
        self.generation.cancel();
        {
            let mut state = self.timeline.lock();
            state.accumulator = accumulator;
            self.timeline.install(&mut state, generation.id());
        }
        self.ring = ring;
        self.counter = CycleCounter::new(generation.plan().max_factor());
        self.breaker.reset();
        self.monitor.clear();
        self.stats
            .generation
            .store(generation.id(), Ordering::Relaxed);
        tracing::info!(
            generation = generation.id(),
            frames = generation.plan().frame_count(),
            channels = generation.store().channels(),
            "impulse installed"
        );
        self.generation = generation;
    }

    fn force_reset(&mut self) {
        let renewed = self.generation.renewed();
        self.generation.cancel();
        self.ring.clear();
        self.counter.reset();
        {
            let mut state = self.timeline.lock();
            self.timeline.install(&mut state, renewed.id());
        }
        self.stats
            .generation
            .store(renewed.id(), Ordering::Relaxed);
        StatsCounters::bump(&self.stats.forced_resets);
        self.controls.request_resynthesis();
        tracing::warn!(
            cycle = self.cycle,
            generation = renewed.id(),
            "sustained overload; engine reset"
        );
        self.generation = renewed;
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("generation", &self.generation.id())
            .field("cycle", &self.cycle)
            .field("counter", &self.counter.value())
            .finish_non_exhaustive()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.generation.cancel();
        self.pool.shutdown();
        self.timeline.shutdown();
        if let Some(thread) = self.merge_thread.take()
            && thread.join().is_err()
        {
            tracing::error!("merge thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_impulse(frames: usize) -> AudioBuffer {
        let mut samples = vec![0.0; frames];
        samples[0] = 1.0;
        AudioBuffer::mono(48000, samples)
    }

    fn config(block_size: usize) -> EngineConfig {
        EngineConfig {
            block_size,
            sample_rate: 48000,
            channels: 1,
            mix: 100.0,
            workers: 2,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn rejects_wrong_buffer_sizes() {
        let mut engine = Engine::new(config(64), &unit_impulse(1024)).unwrap();
        let mut out = vec![0.0; 64];
        assert!(matches!(
            engine.process_block(&[0.0; 32], &mut out),
            Err(Error::BlockSizeMismatch { expected: 64, actual: 32 })
        ));
        let mut short = vec![0.0; 10];
        assert!(engine.process_block(&[0.0; 64], &mut short).is_err());
    }

    #[test]
    fn counter_wraps_with_period() {
        let mut engine = Engine::new(config(64), &unit_impulse(1024)).unwrap();
        let mut out = vec![0.0; 64];
        let mut seen = Vec::new();
        for _ in 0..10 {
            engine.process_block(&[0.0; 64], &mut out).unwrap();
            seen.push(engine.counter());
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 8, 1, 2]);
    }

    #[test]
    fn spawns_pairs_for_due_factors() {
        let mut engine = Engine::new(config(64), &unit_impulse(1024)).unwrap();
        let mut out = vec![0.0; 64];
        // Counters 1..=4 issue factors {1}, {1, 2}, {1}, {1, 2, 4}.
        for _ in 0..4 {
            engine.process_block(&[0.0; 64], &mut out).unwrap();
        }
        engine.settle();
        assert_eq!(engine.stats().spawned, 2 + 4 + 2 + 6);
    }

    #[test]
    fn dry_path_has_no_latency() {
        let mut cfg = config(64);
        cfg.mix = 0.0;
        let mut engine = Engine::new(cfg, &unit_impulse(1024)).unwrap();
        let input: Vec<f32> = (0..64).map(|i| i as f32 / 640.0).collect();
        let mut out = vec![0.0; 64];
        engine.process_block(&input, &mut out).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn loader_installs_at_next_cycle() {
        let mut engine = Engine::new(config(64), &unit_impulse(1024)).unwrap();
        let first = engine.generation().id();
        let loader = engine.loader();
        let id = loader.load(&unit_impulse(2048)).unwrap();
        assert!(engine.controls().impulse_changing());
        let mut out = vec![0.0; 64];
        engine.process_block(&[0.0; 64], &mut out).unwrap();
        assert_eq!(engine.generation().id(), id);
        assert_ne!(id, first);
        assert_eq!(engine.plan().frame_count(), 2048);
        assert!(!engine.controls().impulse_changing());
        assert_eq!(engine.stats().generation, id);
    }
}
