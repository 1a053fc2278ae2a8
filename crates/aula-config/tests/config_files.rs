//! Configuration files on disk.

use std::path::PathBuf;

use aula_config::{ConfigError, DecaySection, ReverbConfig, ShapingMode};
use aula_core::Engine;
use aula_synth::ImpulseSynthesizer;
use tempfile::TempDir;

#[test]
fn save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("reverb.toml");

    let mut config = ReverbConfig::default();
    config.engine.block_size = 128;
    config.engine.channels = 1;
    config.engine.mix = 70.0;
    config.synthesis.analysis_block = 8;
    config.synthesis.envelope_shaping = ShapingMode::PerSample;
    config.impulse.path = Some(PathBuf::from("plate.wav"));
    config.decay = Some(DecaySection {
        top: vec![1.0; 9],
        bottom: vec![0.25; 9],
    });

    config.save(&path).unwrap();
    let loaded = ReverbConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    match ReverbConfig::load(&path) {
        Err(ConfigError::ReadFile { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected ReadFile, got {other:?}"),
    }
}

#[test]
fn loaded_config_builds_engine_and_synthesizer() {
    let toml = r#"
[engine]
block_size = 32
channels = 1
workers = 1

[synthesis]
analysis_block = 16
envelope_block = 8
crossover_point = 0
crossover_length = 0
target_frames = 512
"#;
    let config = ReverbConfig::from_toml(toml).unwrap();

    let edit = aula_synth::DecayEdit::uniform(17, 1.0, 0.3);
    let synthesis = ImpulseSynthesizer::new(config.synthesis_config())
        .unwrap()
        .synthesize(None, Some(&edit))
        .unwrap();
    assert_eq!(synthesis.impulse.frame_count(), 512);
    assert_eq!(synthesis.impulse.sample_rate(), 44100);

    let engine = Engine::new(config.engine_config(), &synthesis.impulse).unwrap();
    assert_eq!(engine.block_size(), 32);
    assert_eq!(engine.channels(), 1);
    assert_eq!(engine.plan().frame_count(), 512);
}
