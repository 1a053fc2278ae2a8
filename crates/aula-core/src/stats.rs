//! Engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of engine activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Cycles processed.
    pub cycles: u64,
    /// Tasks submitted to the worker pool.
    pub spawned: u64,
    /// Task results added to the accumulator.
    pub merged: u64,
    /// Results dropped because their generation was cancelled.
    pub cancelled: u64,
    /// Results dropped because their due cycle had already passed.
    pub late: u64,
    /// Cycles silenced by the overload breaker.
    pub overloads: u64,
    /// Forced resets after sustained overload.
    pub forced_resets: u64,
    /// Cycles aborted on allocation failure.
    pub aborted: u64,
    /// Id of the installed generation.
    pub generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) cycles: AtomicU64,
    pub(crate) spawned: AtomicU64,
    pub(crate) merged: AtomicU64,
    pub(crate) cancelled: AtomicU64,
    pub(crate) late: AtomicU64,
    pub(crate) overloads: AtomicU64,
    pub(crate) forced_resets: AtomicU64,
    pub(crate) aborted: AtomicU64,
    pub(crate) generation: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EngineStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        EngineStats {
            cycles: get(&self.cycles),
            spawned: get(&self.spawned),
            merged: get(&self.merged),
            cancelled: get(&self.cancelled),
            late: get(&self.late),
            overloads: get(&self.overloads),
            forced_resets: get(&self.forced_resets),
            aborted: get(&self.aborted),
            generation: get(&self.generation),
        }
    }
}
