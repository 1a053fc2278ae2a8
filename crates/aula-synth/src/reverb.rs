//! Synthesis wired to a running engine.
//!
//! [`ConvolutionReverb`] owns an [`Engine`] together with a
//! [`ReverbController`]. The engine half runs on the audio thread; the
//! controller half re-synthesizes impulses and hands them to the engine
//! through its [`ImpulseLoader`]. [`ConvolutionReverb::split`] separates the
//! two for a real device stream.

use std::sync::Arc;

use aula_core::{
    AudioBuffer, CycleOutcome, Engine, EngineConfig, EngineControls, ImpulseLoader,
};

use crate::decay::DecayEdit;
use crate::synthesizer::{ImpulseSynthesizer, Synthesis, SynthesisConfig};
use crate::Result;

/// Where the installed impulse comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpulseMode {
    /// The recording, zero-padded, convolved as-is.
    Recorded,
    /// A synthesized impulse.
    Synthesized,
}

/// The impulse for `mode`, and the synthesis that produced it if any.
fn build_impulse(
    synthesizer: &ImpulseSynthesizer,
    mode: ImpulseMode,
    recording: Option<&AudioBuffer>,
    edit: Option<&DecayEdit>,
    min_frames: usize,
) -> Result<(AudioBuffer, Option<Synthesis>)> {
    match (mode, recording) {
        (ImpulseMode::Recorded, Some(recording)) => Ok((
            recording.clone().zero_padded_to_power_of_two(min_frames),
            None,
        )),
        _ => {
            let synthesis = synthesizer.synthesize(recording, edit)?;
            let impulse = synthesis
                .impulse
                .clone()
                .zero_padded_to_power_of_two(min_frames);
            Ok((impulse, Some(synthesis)))
        }
    }
}

/// Off-audio-thread half: synthesis state and the loader.
#[derive(Debug)]
pub struct ReverbController {
    synthesizer: ImpulseSynthesizer,
    recording: Option<AudioBuffer>,
    edit: Option<DecayEdit>,
    mode: ImpulseMode,
    min_frames: usize,
    last: Option<Synthesis>,
    loader: ImpulseLoader,
    controls: Arc<EngineControls>,
}

impl ReverbController {
    /// Rebuild the impulse and queue it for the engine. Returns the new
    /// generation id.
    ///
    /// Editors should not call this while
    /// [`EngineControls::impulse_changing`] is set.
    pub fn recompute(&mut self) -> Result<u64> {
        let (impulse, synthesis) = build_impulse(
            &self.synthesizer,
            self.mode,
            self.recording.as_ref(),
            self.edit.as_ref(),
            self.min_frames,
        )?;
        if synthesis.is_some() {
            self.last = synthesis;
        }
        Ok(self.loader.load(&impulse)?)
    }

    /// Rebuild if the engine asked for it after a forced reset.
    ///
    /// Returns whether a rebuild was queued.
    pub fn service(&mut self) -> Result<bool> {
        if !self.controls.take_resynthesis_request() {
            return Ok(false);
        }
        tracing::info!("resynthesizing impulse after forced reset");
        self.recompute()?;
        Ok(true)
    }

    /// Switch between the recording and synthesis. Takes effect on the next
    /// [`recompute`](Self::recompute).
    pub fn set_mode(&mut self, mode: ImpulseMode) {
        self.mode = mode;
    }

    /// Current impulse source.
    pub fn mode(&self) -> ImpulseMode {
        self.mode
    }

    /// Replace (or clear) the edited decay curve.
    pub fn set_decay_edit(&mut self, edit: Option<DecayEdit>) {
        self.edit = edit;
    }

    /// Change the crossover region.
    pub fn set_crossover(&mut self, point: usize, length: usize) {
        self.synthesizer.set_crossover(point, length);
    }

    /// Change the synthesized length.
    pub fn set_target_frames(&mut self, frames: usize) {
        self.synthesizer.set_target_frames(frames);
    }

    /// Synthesis parameters.
    pub fn synthesis_config(&self) -> &SynthesisConfig {
        self.synthesizer.config()
    }

    /// Normalized decay endpoints of the last synthesis, for display.
    pub fn decay_display(&self) -> Option<DecayEdit> {
        self.last.as_ref().and_then(Synthesis::decay_display)
    }

    /// The last synthesis, if any.
    pub fn last_synthesis(&self) -> Option<&Synthesis> {
        self.last.as_ref()
    }

    /// Engine parameters and flags.
    pub fn controls(&self) -> Arc<EngineControls> {
        Arc::clone(&self.controls)
    }
}

/// Convolution engine plus impulse synthesis.
#[derive(Debug)]
pub struct ConvolutionReverb {
    engine: Engine,
    controller: ReverbController,
}

impl ConvolutionReverb {
    /// Build the initial impulse and start an engine on it.
    ///
    /// [`ImpulseMode::Recorded`] requires a recording; without one the mode
    /// falls back to synthesis from `edit`.
    pub fn new(
        engine_config: EngineConfig,
        synthesis_config: SynthesisConfig,
        recording: Option<AudioBuffer>,
        edit: Option<DecayEdit>,
        mode: ImpulseMode,
    ) -> Result<Self> {
        let synthesizer = ImpulseSynthesizer::new(synthesis_config)?;
        let mode = if recording.is_none() {
            ImpulseMode::Synthesized
        } else {
            mode
        };

        // The partitioner needs at least four minimum blocks.
        let min_frames = 4 * engine_config.block_size;
        let (impulse, last) = build_impulse(
            &synthesizer,
            mode,
            recording.as_ref(),
            edit.as_ref(),
            min_frames,
        )?;

        let engine = Engine::new(engine_config, &impulse)?;
        let controller = ReverbController {
            synthesizer,
            recording,
            edit,
            mode,
            min_frames,
            last,
            loader: engine.loader(),
            controls: engine.controls(),
        };
        Ok(Self { engine, controller })
    }

    /// Run one engine cycle.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) -> Result<CycleOutcome> {
        Ok(self.engine.process_block(input, output)?)
    }

    /// Service a pending resynthesis request. Call between cycles, never
    /// from the audio thread.
    pub fn service(&mut self) -> Result<bool> {
        self.controller.service()
    }

    /// Rebuild the impulse from the current settings.
    pub fn recompute(&mut self) -> Result<u64> {
        self.controller.recompute()
    }

    /// Normalized decay endpoints of the last synthesis.
    pub fn decay_display(&self) -> Option<DecayEdit> {
        self.controller.decay_display()
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the engine.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The controller.
    pub fn controller(&self) -> &ReverbController {
        &self.controller
    }

    /// Mutable access to the controller.
    pub fn controller_mut(&mut self) -> &mut ReverbController {
        &mut self.controller
    }

    /// Separate the audio-thread engine from the controller.
    pub fn split(self) -> (Engine, ReverbController) {
        (self.engine, self.controller)
    }
}
