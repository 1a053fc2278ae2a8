//! The reverb configuration file.

use std::path::{Path, PathBuf};

use aula_core::EngineConfig;
use aula_synth::{DecayEdit, EnvelopeShaping, SynthesisConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_config;

/// Complete reverb configuration.
///
/// # TOML Format
///
/// ```toml
/// [engine]
/// block_size = 512
/// sample_rate = 44100
/// channels = 2
/// mix = 50.0
/// input_sensitivity = 1.0
/// overload_threshold = 0.5
/// workers = 0
///
/// [synthesis]
/// analysis_block = 1024
/// envelope_block = 256
/// crossover_point = 2048
/// crossover_length = 4096
/// target_frames = 131072
/// seed = 1
/// envelope_shaping = "peak-only"
///
/// [impulse]
/// path = "church.wav"
/// synthesize = false
///
/// [decay]
/// top = [1.0, 0.9]
/// bottom = [0.4, 0.2]
/// ```
///
/// Every section and key is optional; missing values take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReverbConfig {
    /// Convolution engine parameters.
    pub engine: EngineSection,
    /// Impulse synthesis parameters.
    pub synthesis: SynthesisSection,
    /// Impulse source.
    pub impulse: ImpulseSection,
    /// Edited decay curve overriding the fitted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay: Option<DecaySection>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSection {
    /// Minimum block length in frames.
    pub block_size: usize,
    /// Sample rate used when no device dictates one.
    pub sample_rate: u32,
    /// Output channels (1 or 2).
    pub channels: usize,
    /// Wet percentage.
    pub mix: f32,
    /// Input gain.
    pub input_sensitivity: f32,
    /// Mean absolute output level that silences a cycle.
    pub overload_threshold: f32,
    /// Worker threads; 0 picks from the available cores.
    pub workers: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            block_size: engine.block_size,
            sample_rate: engine.sample_rate,
            channels: engine.channels,
            mix: engine.mix,
            input_sensitivity: engine.input_sensitivity,
            overload_threshold: engine.overload_threshold,
            workers: engine.workers,
        }
    }
}

/// Envelope application names in TOML.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ShapingMode {
    /// [`EnvelopeShaping::PeakOnly`].
    #[default]
    PeakOnly,
    /// [`EnvelopeShaping::PerSample`].
    PerSample,
}

impl From<ShapingMode> for EnvelopeShaping {
    fn from(mode: ShapingMode) -> Self {
        match mode {
            ShapingMode::PeakOnly => EnvelopeShaping::PeakOnly,
            ShapingMode::PerSample => EnvelopeShaping::PerSample,
        }
    }
}

impl From<EnvelopeShaping> for ShapingMode {
    fn from(shaping: EnvelopeShaping) -> Self {
        match shaping {
            EnvelopeShaping::PeakOnly => ShapingMode::PeakOnly,
            EnvelopeShaping::PerSample => ShapingMode::PerSample,
        }
    }
}

/// `[synthesis]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisSection {
    /// Spectrogram block length.
    pub analysis_block: usize,
    /// Amplitude envelope block length.
    pub envelope_block: usize,
    /// Samples copied verbatim from the recording.
    pub crossover_point: usize,
    /// Blend length after the crossover point.
    pub crossover_length: usize,
    /// Requested impulse length in frames.
    pub target_frames: usize,
    /// Noise seed.
    pub seed: u64,
    /// Amplitude envelope application.
    pub envelope_shaping: ShapingMode,
}

impl Default for SynthesisSection {
    fn default() -> Self {
        let synthesis = SynthesisConfig::default();
        Self {
            analysis_block: synthesis.analysis_block,
            envelope_block: synthesis.envelope_block,
            crossover_point: synthesis.crossover_point,
            crossover_length: synthesis.crossover_length,
            target_frames: synthesis.target_frames,
            seed: synthesis.seed,
            envelope_shaping: synthesis.envelope_shaping.into(),
        }
    }
}

/// `[impulse]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImpulseSection {
    /// Recorded impulse (WAV).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Convolve with a synthesized impulse instead of the recording.
    pub synthesize: bool,
}

/// `[decay]` section: normalized levels per analysis bin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecaySection {
    /// Level at the first block.
    pub top: Vec<f32>,
    /// Level at the last block.
    pub bottom: Vec<f32>,
}

impl ReverbConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: ReverbConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(validate_config(self)?)
    }

    /// Engine parameters.
    pub fn engine_config(&self) -> EngineConfig {
        let e = &self.engine;
        EngineConfig {
            block_size: e.block_size,
            sample_rate: e.sample_rate,
            channels: e.channels,
            mix: e.mix,
            input_sensitivity: e.input_sensitivity,
            overload_threshold: e.overload_threshold,
            workers: e.workers,
        }
    }

    /// Synthesis parameters. Edit-only synthesis runs at the engine rate.
    pub fn synthesis_config(&self) -> SynthesisConfig {
        let s = &self.synthesis;
        SynthesisConfig {
            analysis_block: s.analysis_block,
            envelope_block: s.envelope_block,
            crossover_point: s.crossover_point,
            crossover_length: s.crossover_length,
            target_frames: s.target_frames,
            seed: s.seed,
            envelope_shaping: s.envelope_shaping.into(),
            sample_rate: self.engine.sample_rate,
        }
    }

    /// The decay override, if any.
    pub fn decay_edit(&self) -> Option<DecayEdit> {
        self.decay.as_ref().map(|d| DecayEdit {
            top: d.top.clone(),
            bottom: d.bottom.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_defaults() {
        let config = ReverbConfig::default();
        assert_eq!(config.engine_config(), EngineConfig::default());
        let synthesis = config.synthesis_config();
        assert_eq!(synthesis.analysis_block, 1024);
        assert_eq!(synthesis.envelope_shaping, EnvelopeShaping::PeakOnly);
        assert_eq!(synthesis.sample_rate, 44100);
        assert!(config.decay_edit().is_none());
    }

    #[test]
    fn test_minimal_toml() {
        let config = ReverbConfig::from_toml("").unwrap();
        assert_eq!(config, ReverbConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
[engine]
block_size = 256
mix = 35.0

[synthesis]
envelope_shaping = "per-sample"

[impulse]
path = "hall.wav"
synthesize = true
"#;
        let config = ReverbConfig::from_toml(toml).unwrap();
        assert_eq!(config.engine.block_size, 256);
        assert_eq!(config.engine.mix, 35.0);
        assert_eq!(config.engine.channels, 2);
        assert_eq!(config.synthesis.envelope_shaping, ShapingMode::PerSample);
        assert_eq!(config.impulse.path, Some(PathBuf::from("hall.wav")));
        assert!(config.impulse.synthesize);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = ReverbConfig::from_toml("[engine]\nblock_size = 300\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = ReverbConfig::from_toml("[engine]\nblock_size = \"big\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));

        let err = ReverbConfig::from_toml("[synthesis]\nenvelope_shaping = \"cubic\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_to_toml_names_shaping() {
        let toml = ReverbConfig::default().to_toml().unwrap();
        assert!(toml.contains("[engine]"));
        assert!(toml.contains("envelope_shaping = \"peak-only\""));
        assert!(!toml.contains("[decay]"));
    }

    #[test]
    fn test_decay_edit_conversion() {
        let mut config = ReverbConfig::default();
        config.synthesis.analysis_block = 2;
        config.decay = Some(DecaySection {
            top: vec![1.0, 0.9, 0.8],
            bottom: vec![0.3, 0.2, 0.1],
        });
        config.validate().unwrap();

        let edit = config.decay_edit().unwrap();
        assert_eq!(edit.bins(), 3);
        assert_eq!(edit.bottom, vec![0.3, 0.2, 0.1]);
    }
}
