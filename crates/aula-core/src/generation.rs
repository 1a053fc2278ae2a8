//! Everything derived from one impulse, plus its cancellation token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::partition::BlockLengthPlan;
use crate::spectral::SpectralBlockStore;
use crate::{AudioBuffer, Result};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Shared flag marking a generation's tasks as stale.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every holder as cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One installed impulse: its plan, spectra and token.
#[derive(Debug, Clone)]
pub struct Generation {
    id: u64,
    store: Arc<SpectralBlockStore>,
    token: CancellationToken,
}

impl Generation {
    /// Partition and transform `impulse`.
    pub fn build(impulse: &AudioBuffer, block_size: usize) -> Result<Self> {
        let store = SpectralBlockStore::build(impulse, block_size)?;
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Wrap an existing store in a new generation.
    pub fn from_store(store: Arc<SpectralBlockStore>) -> Self {
        Self {
            id: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            store,
            token: CancellationToken::new(),
        }
    }

    /// Same spectra under a new id and a fresh token.
    pub fn renewed(&self) -> Self {
        Self::from_store(Arc::clone(&self.store))
    }

    /// Unique generation id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Partition plan.
    pub fn plan(&self) -> &BlockLengthPlan {
        self.store.plan()
    }

    /// Shared spectra.
    pub fn store(&self) -> &Arc<SpectralBlockStore> {
        &self.store
    }

    /// Token checked by this generation's tasks.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel every outstanding task of this generation.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn renewed_keeps_store_and_resets_token() {
        let generation = Generation::build(&AudioBuffer::mono(48000, vec![0.0; 256]), 16).unwrap();
        generation.cancel();
        let renewed = generation.renewed();
        assert!(Arc::ptr_eq(generation.store(), renewed.store()));
        assert!(renewed.id() > generation.id());
        assert!(!renewed.token().is_cancelled());
        assert!(generation.token().is_cancelled());
    }
}
