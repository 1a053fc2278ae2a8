//! Fixed pool of convolution workers.
//!
//! Workers are created once when the engine starts and pull tasks from a
//! shared channel, so issuing a task on the audio thread is a single
//! non-blocking send.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::controls::SpectrumMonitor;
use crate::task::ConvolutionTask;
use crate::timeline::Timeline;
use crate::{Error, Result};

/// Worker count when none is configured: one less than the available cores.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(
        id: usize,
        tasks: Receiver<ConvolutionTask>,
        timeline: Arc<Timeline>,
        monitor: Arc<SpectrumMonitor>,
    ) -> Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("aula-worker-{}", id))
            .spawn(move || Worker::run(&tasks, &timeline, &monitor))
            .map_err(Error::WorkerSpawn)?;
        Ok(Self {
            id,
            thread: Some(thread),
        })
    }

    fn run(tasks: &Receiver<ConvolutionTask>, timeline: &Timeline, monitor: &SpectrumMonitor) {
        // Exits once every sender is dropped.
        while let Ok(task) = tasks.recv() {
            match task.compute(monitor) {
                Some(result) => timeline.deliver(result),
                None => timeline.task_skipped(),
            }
        }
    }
}

pub(crate) struct WorkerPool {
    sender: Option<Sender<ConvolutionTask>>,
    workers: Vec<Worker>,
}

impl WorkerPool {
    pub(crate) fn new(
        size: usize,
        timeline: &Arc<Timeline>,
        monitor: &Arc<SpectrumMonitor>,
    ) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let workers = (0..size.max(1))
            .map(|id| {
                Worker::spawn(
                    id,
                    receiver.clone(),
                    Arc::clone(timeline),
                    Arc::clone(monitor),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(workers = workers.len(), "convolution worker pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub(crate) fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a task without blocking.
    pub(crate) fn submit(&self, task: ConvolutionTask) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or(Error::EngineStopped)?
            .send(task)
            .map_err(|_| Error::EngineStopped)
    }

    /// Close the queue and join every worker.
    pub(crate) fn shutdown(&mut self) {
        self.sender.take();
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take()
                && thread.join().is_err()
            {
                tracing::error!(worker = worker.id, "convolution worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
