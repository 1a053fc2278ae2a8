//! Fixed-size cycles from arbitrary device buffers.
//!
//! Device callbacks arrive with whatever buffer length the host picks. The
//! engine needs exactly `B` input frames per cycle. [`Reblocker`] queues
//! captured samples, runs as many cycles as the output buffer needs and
//! queues the surplus for the next callback.

use std::collections::VecDeque;

/// Input and output FIFOs between a device and a block-based processor.
#[derive(Debug)]
pub struct Reblocker {
    block_size: usize,
    engine_channels: usize,
    device_channels: usize,
    input: VecDeque<f32>,
    output: VecDeque<f32>,
    block_in: Vec<f32>,
    block_out: Vec<f32>,
    underruns: u64,
}

impl Reblocker {
    /// Re-blocker for cycles of `block_size` mono input frames producing
    /// `engine_channels` interleaved outputs, played on a device with
    /// `device_channels` channels.
    pub fn new(block_size: usize, engine_channels: usize, device_channels: usize) -> Self {
        let block_size = block_size.max(1);
        let engine_channels = engine_channels.max(1);
        Self {
            block_size,
            engine_channels,
            device_channels: device_channels.max(1),
            input: VecDeque::with_capacity(4 * block_size),
            output: VecDeque::with_capacity(4 * block_size * device_channels.max(1)),
            block_in: vec![0.0; block_size],
            block_out: vec![0.0; block_size * engine_channels],
            underruns: 0,
        }
    }

    /// Cycle length in frames.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Queue captured audio. Only the first of `channels` interleaved
    /// channels is kept.
    pub fn push_input(&mut self, interleaved: &[f32], channels: usize) {
        let channels = channels.max(1);
        self.input
            .extend(interleaved.iter().step_by(channels).copied());
    }

    /// Captured frames not yet consumed by a cycle.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Device samples rendered but not yet played.
    pub fn pending_output(&self) -> usize {
        self.output.len()
    }

    /// Callbacks that could not be filled completely.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// Fill one interleaved device buffer, running `cycle` once per `B`
    /// queued input frames until enough output is available.
    ///
    /// `cycle` receives `B` mono input frames and fills `B` interleaved
    /// engine frames. When input runs short the remainder of `out` is
    /// silenced and `false` is returned.
    pub fn render<F>(&mut self, out: &mut [f32], cycle: &mut F) -> bool
    where
        F: FnMut(&[f32], &mut [f32]),
    {
        while self.output.len() < out.len() && self.input.len() >= self.block_size {
            for (dst, src) in self.block_in.iter_mut().zip(self.input.drain(..self.block_size)) {
                *dst = src;
            }
            self.block_out.fill(0.0);
            cycle(&self.block_in, &mut self.block_out);
            self.queue_output();
        }

        let available = self.output.len().min(out.len());
        for (dst, src) in out.iter_mut().zip(self.output.drain(..available)) {
            *dst = src;
        }
        if available < out.len() {
            out[available..].fill(0.0);
            self.underruns += 1;
            return false;
        }
        true
    }

    /// Map one engine block onto device channels: mono is duplicated, stereo
    /// feeds the first two channels (averaged on a mono device).
    fn queue_output(&mut self) {
        let ec = self.engine_channels;
        let dc = self.device_channels;
        for frame in self.block_out.chunks_exact(ec) {
            match (ec, dc) {
                (1, _) => self.output.extend(std::iter::repeat_n(frame[0], dc)),
                (_, 1) => self.output.push_back(0.5 * (frame[0] + frame[1])),
                _ => {
                    self.output.push_back(frame[0]);
                    self.output.push_back(frame[1]);
                    self.output.extend(std::iter::repeat_n(0.0, dc - 2));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough(input: &[f32], output: &mut [f32]) {
        output.copy_from_slice(input);
    }

    #[test]
    fn odd_device_buffers_are_reblocked() {
        let mut reblocker = Reblocker::new(4, 1, 1);
        let mut cycles = 0;
        let mut cycle = |input: &[f32], output: &mut [f32]| {
            assert_eq!(input.len(), 4);
            cycles += 1;
            passthrough(input, output);
        };

        let signal: Vec<f32> = (0..30).map(|n| n as f32).collect();
        let mut played = Vec::new();
        for chunk in signal.chunks(3) {
            reblocker.push_input(chunk, 1);
            let mut out = [0.0; 3];
            reblocker.render(&mut out, &mut cycle);
            played.extend_from_slice(&out);
        }
        assert_eq!(cycles, 7);
        // Output begins once the first full block is captured.
        let start = played.iter().position(|&x| x == 1.0).unwrap() - 1;
        assert_eq!(played[start..start + 8], signal[..8]);
    }

    #[test]
    fn block_sized_buffers_run_one_cycle_each() {
        let mut reblocker = Reblocker::new(8, 1, 2);
        let mut cycles = 0;
        let mut cycle = |input: &[f32], output: &mut [f32]| {
            cycles += 1;
            passthrough(input, output);
        };

        for n in 0..5 {
            reblocker.push_input(&[n as f32; 16], 2);
            let mut out = vec![0.0; 16];
            assert!(reblocker.render(&mut out, &mut cycle));
            assert!(out.iter().all(|&x| x == n as f32));
            assert_eq!(reblocker.pending_input(), 0);
            assert_eq!(reblocker.pending_output(), 0);
        }
        assert_eq!(cycles, 5);
        assert_eq!(reblocker.underruns(), 0);
    }

    #[test]
    fn mono_engine_feeds_every_device_channel() {
        let mut reblocker = Reblocker::new(2, 1, 2);
        reblocker.push_input(&[0.5, 9.0, -0.5, 9.0], 2);
        let mut out = [0.0; 4];
        assert!(reblocker.render(&mut out, &mut passthrough));
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn stereo_engine_on_mono_device_is_averaged() {
        let mut reblocker = Reblocker::new(1, 2, 1);
        reblocker.push_input(&[1.0], 1);
        let mut out = [0.0; 1];
        let mut cycle = |_: &[f32], output: &mut [f32]| output.copy_from_slice(&[1.0, 0.0]);
        assert!(reblocker.render(&mut out, &mut cycle));
        assert_eq!(out, [0.5]);
    }

    #[test]
    fn stereo_engine_leaves_extra_channels_silent() {
        let mut reblocker = Reblocker::new(1, 2, 4);
        reblocker.push_input(&[1.0], 1);
        let mut out = [9.0; 4];
        let mut cycle = |_: &[f32], output: &mut [f32]| output.copy_from_slice(&[0.25, 0.75]);
        assert!(reblocker.render(&mut out, &mut cycle));
        assert_eq!(out, [0.25, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn underrun_is_silent() {
        let mut reblocker = Reblocker::new(8, 1, 1);
        reblocker.push_input(&[1.0; 5], 1);
        let mut out = [9.0; 8];
        assert!(!reblocker.render(&mut out, &mut passthrough));
        assert!(out.iter().all(|&x| x == 0.0));
        assert_eq!(reblocker.underruns(), 1);
        assert_eq!(reblocker.pending_input(), 5);
    }

    #[test]
    fn surplus_output_carries_over() {
        let mut reblocker = Reblocker::new(4, 1, 1);
        reblocker.push_input(&[1.0, 2.0, 3.0, 4.0], 1);
        let mut out = [0.0; 3];
        assert!(reblocker.render(&mut out, &mut passthrough));
        assert_eq!(out, [1.0, 2.0, 3.0]);
        assert_eq!(reblocker.pending_output(), 1);

        let mut out = [0.0; 1];
        assert!(reblocker.render(&mut out, &mut passthrough));
        assert_eq!(out, [4.0]);
    }
}
