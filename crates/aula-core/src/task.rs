//! Work items handed to the pool: one block convolution each.

use std::ops::Range;

use rustfft::num_complex::Complex;

use crate::controls::SpectrumMonitor;
use crate::generation::{CancellationToken, Generation};
use crate::partition::PlanEntry;

/// Convolution of a snapshot of recent input with one impulse block.
#[derive(Debug)]
pub struct ConvolutionTask {
    /// Ring range the input was copied from.
    pub sample_range: Range<usize>,
    /// 1-based plan entry.
    pub block_index: usize,
    /// Size multiplier of the block.
    pub factor: usize,
    /// Cycles between issue and merge.
    pub cycles_until_due: usize,
    /// Counter value when issued.
    pub issued_at_cycle: usize,
    /// Counter value of the merge cycle.
    pub target_cycle: usize,
    /// Absolute cycle after which the result is merged.
    pub due_at: u64,
    /// Generation the task belongs to.
    pub generation: Generation,
    input: Vec<Complex<f32>>,
}

/// Output of a completed task, one buffer per impulse channel.
#[derive(Debug)]
pub struct TaskResult {
    /// Absolute cycle the result is merged after.
    pub due_at: u64,
    /// Generation the result was computed against.
    pub generation: u64,
    /// Token to re-check right before merging.
    pub token: CancellationToken,
    /// `2·len` samples per impulse channel, already normalized.
    pub channels: Vec<Vec<f32>>,
}

impl ConvolutionTask {
    /// Build a task for `entry` from a zero-padded input snapshot.
    pub(crate) fn new(
        entry: &PlanEntry,
        sample_range: Range<usize>,
        issued_at_cycle: usize,
        target_cycle: usize,
        due_at: u64,
        generation: Generation,
        input: Vec<Complex<f32>>,
    ) -> Self {
        Self {
            sample_range,
            block_index: entry.index,
            factor: entry.factor,
            cycles_until_due: entry.cycles_until_due(),
            issued_at_cycle,
            target_cycle,
            due_at,
            generation,
            input,
        }
    }

    /// Whether the task's generation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.generation.token().is_cancelled()
    }

    /// Convolve the snapshot with every channel of the block.
    ///
    /// Returns `None` when the generation was cancelled before the work
    /// started.
    pub fn compute(mut self, monitor: &SpectrumMonitor) -> Option<TaskResult> {
        if self.is_cancelled() {
            return None;
        }
        let store = self.generation.store();
        let fft = store.fft(self.input.len())?;
        fft.forward_complex(&mut self.input);

        if self.block_index == 1 {
            let bins = self.input.len() / 2 + 1;
            monitor.publish(self.input[..bins].iter().map(|c| c.norm()));
        }

        let scale = 1.0 / self.factor as f32;
        let mut channels = Vec::with_capacity(store.channels());
        let mut product = vec![Complex::new(0.0, 0.0); self.input.len()];
        for channel in 0..store.channels() {
            let spectrum = store.spectrum(channel, self.block_index)?;
            for ((p, x), h) in product.iter_mut().zip(&self.input).zip(spectrum) {
                *p = x * h;
            }
            fft.inverse_complex(&mut product);
            channels.push(product.iter().map(|c| c.re * scale).collect());
        }

        Some(TaskResult {
            due_at: self.due_at,
            generation: self.generation.id(),
            token: self.generation.token().clone(),
            channels,
        })
    }
}
