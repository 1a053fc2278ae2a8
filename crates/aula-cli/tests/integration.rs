//! Integration tests for the `aula` binary.

use std::process::Command;

use aula_config::ReverbConfig;
use aula_core::AudioBuffer;
use aula_io::{read_audio, write_impulse};
use tempfile::TempDir;

fn aula_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_aula"))
}

fn decaying_recording(frames: usize) -> AudioBuffer {
    let samples = (0..frames)
        .map(|n| (-(n as f32) / 500.0).exp() * ((n as f32) * 0.3).sin())
        .collect();
    AudioBuffer::mono(44100, samples)
}

#[test]
fn cli_help_lists_commands() {
    let output = aula_bin().arg("--help").output().expect("failed to run aula");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["realtime", "synthesize", "plan", "info", "devices", "config"] {
        assert!(stdout.contains(command), "help should list '{command}'");
    }
}

#[test]
fn cli_plan_json_pairs_blocks() {
    let output = aula_bin()
        .args(["plan", "--frames", "65536", "--block-size", "512", "--json"])
        .output()
        .expect("failed to run aula plan");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = report["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 12);
    assert_eq!(report["max_factor"], 32);
    assert_eq!(report["dropped_tail"], 1024);
    assert_eq!(report["latency_frames"], 512);
    assert_eq!(entries[0]["factor"], 1);
    assert_eq!(entries[11]["factor"], 32);
    assert_eq!(entries[11]["parity"], "even");
    assert_eq!(entries[11]["cycles_until_due"], 63);
}

#[test]
fn cli_plan_table() {
    let output = aula_bin()
        .args(["plan", "--frames", "4096", "--block-size", "64"])
        .output()
        .expect("failed to run aula plan");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Block plan: 4096 frames, B = 64"));
    assert!(stdout.contains("Latency:"));
}

#[test]
fn cli_plan_rejects_non_power_of_two() {
    let output = aula_bin()
        .args(["plan", "--frames", "1000"])
        .output()
        .expect("failed to run aula plan");
    assert!(!output.status.success());
}

#[test]
fn cli_config_prints_defaults() {
    let output = aula_bin()
        .arg("config")
        .output()
        .expect("failed to run aula config");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[engine]"));
    assert!(stdout.contains("block_size = 512"));
    assert!(stdout.contains("[synthesis]"));
}

#[test]
fn cli_config_write_then_check() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reverb.toml");

    let output = aula_bin()
        .args(["config", "--write"])
        .arg(&path)
        .output()
        .expect("failed to run aula config --write");
    assert!(output.status.success());
    assert_eq!(ReverbConfig::load(&path).unwrap(), ReverbConfig::default());

    let output = aula_bin()
        .args(["config", "--check"])
        .arg(&path)
        .output()
        .expect("failed to run aula config --check");
    assert!(output.status.success());

    std::fs::write(&path, "[engine]\nmix = 250.0\n").unwrap();
    let output = aula_bin()
        .args(["config", "--check"])
        .arg(&path)
        .output()
        .expect("failed to run aula config --check");
    assert!(!output.status.success());
}

#[test]
fn cli_synthesize_writes_impulse_and_decay() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("room.wav");
    let output_path = dir.path().join("synth.wav");
    let decay_path = dir.path().join("decay.toml");
    write_impulse(&input, &decaying_recording(3000)).unwrap();

    let output = aula_bin()
        .args(["synthesize", "--target-frames", "8192", "--seed", "9", "--impulse"])
        .arg(&input)
        .arg("--output")
        .arg(&output_path)
        .arg("--decay-out")
        .arg(&decay_path)
        .output()
        .expect("failed to run aula synthesize");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let impulse = read_audio(&output_path).unwrap();
    assert_eq!(impulse.frame_count(), 8192);
    assert_eq!(impulse.sample_rate(), 44100);
    assert!((impulse.peak() - 1.0).abs() < 1e-4);

    let config = ReverbConfig::load(&decay_path).unwrap();
    let decay = config.decay.unwrap();
    assert_eq!(decay.top.len(), 1025);
    assert_eq!(config.synthesis.seed, 9);
}

#[test]
fn cli_synthesize_requires_a_source() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("empty.toml");
    std::fs::write(&config, "").unwrap();
    let output = aula_bin()
        .args(["synthesize", "--output"])
        .arg(dir.path().join("out.wav"))
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run aula synthesize");
    assert!(!output.status.success());
}

#[test]
fn cli_info_reports_impulse_plan() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.wav");
    write_impulse(&path, &decaying_recording(1000)).unwrap();

    let output = aula_bin()
        .arg("info")
        .arg(&path)
        .args(["--block-size", "64"])
        .output()
        .expect("failed to run aula info");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("IEEE Float 32-bit"));
    assert!(stdout.contains("1024 frames padded"));
}
