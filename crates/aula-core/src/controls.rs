//! Lock-free controls shared between the editor, control thread and driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;

/// A thread-safe atomic parameter using bit-cast f32.
///
/// Control threads write, the audio thread reads. No locks, no allocations.
#[derive(Debug)]
pub struct AtomicParam {
    value: AtomicU32,
    min: f32,
    max: f32,
    default: f32,
}

impl AtomicParam {
    /// Create a new atomic parameter with range and default.
    pub fn new(default: f32, min: f32, max: f32) -> Self {
        Self {
            value: AtomicU32::new(default.clamp(min, max).to_bits()),
            min,
            max,
            default,
        }
    }

    /// Set the parameter value, clamped to its range.
    #[inline]
    pub fn set(&self, v: f32) {
        let clamped = v.clamp(self.min, self.max);
        self.value.store(clamped.to_bits(), Ordering::Release);
    }

    /// Get the parameter value.
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }

    /// Get the default value.
    pub fn default(&self) -> f32 {
        self.default
    }

    /// Reset to default value.
    pub fn reset(&self) {
        self.set(self.default);
    }
}

/// Parameters and flags the driver reads every cycle.
#[derive(Debug)]
pub struct EngineControls {
    mix: AtomicParam,
    input_sensitivity: AtomicParam,
    impulse_changing: AtomicBool,
    resynthesis_requested: AtomicBool,
}

/// Upper bound accepted for input sensitivity.
pub const MAX_INPUT_SENSITIVITY: f32 = 16.0;

impl EngineControls {
    /// Controls starting at `mix` percent wet and the given input gain.
    pub fn new(mix: f32, input_sensitivity: f32) -> Self {
        Self {
            mix: AtomicParam::new(mix, 0.0, 100.0),
            input_sensitivity: AtomicParam::new(input_sensitivity, 0.0, MAX_INPUT_SENSITIVITY),
            impulse_changing: AtomicBool::new(false),
            resynthesis_requested: AtomicBool::new(false),
        }
    }

    /// Wet/dry balance in percent (0 = dry, 100 = wet).
    pub fn mix(&self) -> f32 {
        self.mix.get()
    }

    /// Set the wet percentage.
    pub fn set_mix(&self, percent: f32) {
        self.mix.set(percent);
    }

    /// Gain applied to input before it enters the history.
    pub fn input_sensitivity(&self) -> f32 {
        self.input_sensitivity.get()
    }

    /// Set the input gain.
    pub fn set_input_sensitivity(&self, gain: f32) {
        self.input_sensitivity.set(gain);
    }

    /// True from impulse submission until the driver installs it.
    pub fn impulse_changing(&self) -> bool {
        self.impulse_changing.load(Ordering::Acquire)
    }

    pub(crate) fn set_impulse_changing(&self, changing: bool) {
        self.impulse_changing.store(changing, Ordering::Release);
    }

    /// Whether a forced reset asked for the impulse to be resynthesized.
    pub fn resynthesis_requested(&self) -> bool {
        self.resynthesis_requested.load(Ordering::Acquire)
    }

    /// Clear and return the resynthesis request.
    pub fn take_resynthesis_request(&self) -> bool {
        self.resynthesis_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn request_resynthesis(&self) {
        self.resynthesis_requested.store(true, Ordering::Release);
    }
}

impl Default for EngineControls {
    fn default() -> Self {
        Self::new(50.0, 1.0)
    }
}

/// Smoothing factor applied to successive input spectra.
const SPECTRUM_SMOOTHING: f32 = 0.8;

/// Smoothed input magnitude spectrum for display.
///
/// Written by the task for block 1 each cycle. Publication uses `try_lock`
/// and skips a frame rather than wait for a reader.
#[derive(Debug, Default)]
pub struct SpectrumMonitor {
    bins: Mutex<Vec<f32>>,
}

impl SpectrumMonitor {
    /// Empty monitor.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Blend a new magnitude frame into the display.
    pub fn publish(&self, magnitudes: impl ExactSizeIterator<Item = f32>) {
        let Some(mut bins) = self.bins.try_lock() else {
            return;
        };
        if bins.len() != magnitudes.len() {
            bins.clear();
            bins.extend(magnitudes);
            return;
        }
        for (bin, m) in bins.iter_mut().zip(magnitudes) {
            *bin = *bin * SPECTRUM_SMOOTHING + m * (1.0 - SPECTRUM_SMOOTHING);
        }
    }

    /// Copy of the current smoothed spectrum (bins `0..=B`).
    pub fn input_spectrum(&self) -> Vec<f32> {
        self.bins.lock().clone()
    }

    /// Forget the displayed spectrum.
    pub fn clear(&self) {
        self.bins.lock().clear();
    }
}
