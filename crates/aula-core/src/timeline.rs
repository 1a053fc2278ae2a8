//! Shared accumulator, completed-cycle clock and parked results.
//!
//! Workers deliver results here. A result due at the cycle that has just
//! completed is merged immediately; one due later is parked and merged by the
//! merge thread when the driver publishes that cycle. Everything that touches
//! the accumulator happens under one lock, so a merge can never interleave
//! with the driver's mix and shift.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::accumulator::OutputAccumulator;
use crate::stats::StatsCounters;
use crate::task::TaskResult;
use crate::{Error, Result};

#[derive(Debug)]
pub(crate) struct TimelineState {
    pub(crate) accumulator: OutputAccumulator,
    pub(crate) completed: u64,
    pub(crate) generation: u64,
    parked: Vec<TaskResult>,
    shutdown: bool,
}

impl TimelineState {
    /// Add a result's channels at offset 0, mapping impulse channels onto
    /// output channels.
    fn merge(&mut self, result: &TaskResult) {
        let outputs = self.accumulator.channels();
        match (result.channels.len(), outputs) {
            (1, _) => {
                for out in 0..outputs {
                    self.accumulator.add(out, 0, &result.channels[0]);
                }
            }
            (n, 1) => {
                let scale = 1.0 / n as f32;
                for channel in &result.channels {
                    let scaled: Vec<f32> = channel.iter().map(|x| x * scale).collect();
                    self.accumulator.add(0, 0, &scaled);
                }
            }
            _ => {
                for (out, channel) in result.channels.iter().enumerate().take(outputs) {
                    self.accumulator.add(out, 0, channel);
                }
            }
        }
    }

    fn is_current(&self, result: &TaskResult) -> bool {
        result.generation == self.generation && !result.token.is_cancelled()
    }

    fn has_due_parked(&self) -> bool {
        self.parked.iter().any(|r| r.due_at <= self.completed)
    }
}

#[derive(Debug)]
pub(crate) struct Timeline {
    state: Mutex<TimelineState>,
    cycle_completed: Condvar,
    idle: Condvar,
    computing: AtomicUsize,
    stats: Arc<StatsCounters>,
}

impl Timeline {
    pub(crate) fn new(accumulator: OutputAccumulator, stats: Arc<StatsCounters>) -> Self {
        Self {
            state: Mutex::new(TimelineState {
                accumulator,
                completed: 0,
                generation: 0,
                parked: Vec::new(),
                shutdown: false,
            }),
            cycle_completed: Condvar::new(),
            idle: Condvar::new(),
            computing: AtomicUsize::new(0),
            stats,
        }
    }

    /// Lock the shared state for the driver's mix and shift.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TimelineState> {
        self.state.lock()
    }

    /// Record that a task has been handed to the pool.
    pub(crate) fn task_started(&self) {
        self.computing.fetch_add(1, Ordering::AcqRel);
    }

    /// A task was dropped before producing a result.
    pub(crate) fn task_skipped(&self) {
        let _state = self.state.lock();
        StatsCounters::bump(&self.stats.cancelled);
        self.computing.fetch_sub(1, Ordering::AcqRel);
        self.idle.notify_all();
    }

    /// Merge, park or drop a finished result.
    pub(crate) fn deliver(&self, result: TaskResult) {
        let mut state = self.state.lock();
        if !state.is_current(&result) {
            StatsCounters::bump(&self.stats.cancelled);
        } else if result.due_at == state.completed {
            state.merge(&result);
            StatsCounters::bump(&self.stats.merged);
        } else if result.due_at > state.completed {
            state.parked.push(result);
        } else {
            StatsCounters::bump(&self.stats.late);
            tracing::warn!(
                due_at = result.due_at,
                completed = state.completed,
                "task result missed its cycle"
            );
        }
        self.computing.fetch_sub(1, Ordering::AcqRel);
        self.idle.notify_all();
    }

    /// Publish `cycle` as completed and wake the merge thread.
    pub(crate) fn publish(&self, state: &mut TimelineState, cycle: u64) {
        state.completed = cycle;
        self.cycle_completed.notify_all();
    }

    /// Switch to generation `id`, dropping parked results and silencing the
    /// accumulator.
    pub(crate) fn install(&self, state: &mut TimelineState, id: u64) {
        let dropped = state.parked.len() as u64;
        state.parked.clear();
        state.accumulator.clear();
        state.generation = id;
        if dropped > 0 {
            self.stats.cancelled.fetch_add(dropped, Ordering::Relaxed);
        }
        self.idle.notify_all();
    }

    /// Block until no task is computing and nothing parked is due.
    pub(crate) fn settle(&self) {
        let mut state = self.state.lock();
        while !state.shutdown
            && (self.computing.load(Ordering::Acquire) > 0 || state.has_due_parked())
        {
            self.idle.wait(&mut state);
        }
    }

    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.cycle_completed.notify_all();
        self.idle.notify_all();
    }

    fn merge_loop(&self) {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                break;
            }
            if state.has_due_parked() {
                let completed = state.completed;
                let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.parked)
                    .into_iter()
                    .partition(|r| r.due_at <= completed);
                state.parked = waiting;
                for result in due {
                    if !state.is_current(&result) {
                        StatsCounters::bump(&self.stats.cancelled);
                    } else if result.due_at == completed {
                        state.merge(&result);
                        StatsCounters::bump(&self.stats.merged);
                    } else {
                        StatsCounters::bump(&self.stats.late);
                        tracing::warn!(
                            due_at = result.due_at,
                            completed,
                            "parked result missed its cycle"
                        );
                    }
                }
                self.idle.notify_all();
            }
            self.cycle_completed.wait(&mut state);
        }
    }
}

/// Start the thread that merges parked results as cycles complete.
pub(crate) fn spawn_merge_thread(timeline: Arc<Timeline>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("aula-merge".into())
        .spawn(move || timeline.merge_loop())
        .map_err(Error::WorkerSpawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CancellationToken;

    fn timeline(channels: usize) -> Timeline {
        let acc = OutputAccumulator::new(channels, 8, 2).unwrap();
        Timeline::new(acc, Arc::new(StatsCounters::default()))
    }

    fn result(due_at: u64, generation: u64, channels: Vec<Vec<f32>>) -> TaskResult {
        TaskResult {
            due_at,
            generation,
            token: CancellationToken::new(),
            channels,
        }
    }

    #[test]
    fn merges_when_due_now() {
        let timeline = timeline(1);
        timeline.task_started();
        timeline.deliver(result(0, 0, vec![vec![1.0, 2.0]]));
        let state = timeline.lock();
        assert_eq!(state.accumulator.head(0), &[1.0, 2.0]);
        assert!(state.parked.is_empty());
    }

    #[test]
    fn parks_future_results() {
        let timeline = timeline(1);
        timeline.task_started();
        timeline.deliver(result(3, 0, vec![vec![1.0]]));
        let state = timeline.lock();
        assert_eq!(state.parked.len(), 1);
        assert_eq!(state.accumulator.head(0), &[0.0, 0.0]);
    }

    #[test]
    fn drops_stale_and_late_results() {
        let timeline = timeline(1);
        {
            let mut state = timeline.lock();
            timeline.publish(&mut state, 5);
        }
        timeline.task_started();
        timeline.deliver(result(4, 0, vec![vec![1.0]]));
        timeline.task_started();
        timeline.deliver(result(5, 7, vec![vec![1.0]]));
        let stats = timeline.stats.snapshot();
        assert_eq!(stats.late, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.merged, 0);
    }

    #[test]
    fn mono_result_feeds_both_outputs() {
        let timeline = timeline(2);
        timeline.task_started();
        timeline.deliver(result(0, 0, vec![vec![1.0]]));
        let state = timeline.lock();
        assert_eq!(state.accumulator.head(0)[0], 1.0);
        assert_eq!(state.accumulator.head(1)[0], 1.0);
    }

    #[test]
    fn stereo_result_folds_to_mono() {
        let timeline = timeline(1);
        timeline.task_started();
        timeline.deliver(result(0, 0, vec![vec![1.0], vec![0.5]]));
        assert_eq!(timeline.lock().accumulator.head(0)[0], 0.75);
    }

    #[test]
    fn merge_thread_merges_parked_result() {
        let timeline = Arc::new(timeline(1));
        let handle = spawn_merge_thread(Arc::clone(&timeline)).unwrap();
        timeline.task_started();
        timeline.deliver(result(1, 0, vec![vec![2.0]]));
        {
            let mut state = timeline.lock();
            state.accumulator.shift();
            timeline.publish(&mut state, 1);
        }
        timeline.settle();
        assert_eq!(timeline.lock().accumulator.head(0)[0], 2.0);
        timeline.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn install_drops_parked() {
        let timeline = timeline(1);
        timeline.task_started();
        timeline.deliver(result(9, 0, vec![vec![1.0]]));
        {
            let mut state = timeline.lock();
            timeline.install(&mut state, 2);
            assert!(state.parked.is_empty());
            assert_eq!(state.generation, 2);
        }
        assert_eq!(timeline.stats.snapshot().cancelled, 1);
    }
}
