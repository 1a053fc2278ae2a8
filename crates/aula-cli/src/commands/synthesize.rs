//! Offline impulse synthesis command.

use std::path::PathBuf;

use anyhow::Context;
use aula_config::DecaySection;
use aula_io::{read_audio, write_impulse};
use aula_synth::ImpulseSynthesizer;
use clap::Args;

use super::common::{impulse_path, load_config};

#[derive(Args)]
pub struct SynthesizeArgs {
    /// Recorded impulse to analyze (WAV); optional when the config has a [decay] curve
    #[arg(short, long)]
    impulse: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Requested length in frames (rounded up to a power of two)
    #[arg(short, long)]
    target_frames: Option<usize>,

    /// Noise seed
    #[arg(long)]
    seed: Option<u64>,

    /// Samples copied verbatim from the recording
    #[arg(long)]
    crossover_point: Option<usize>,

    /// Blend length after the crossover point
    #[arg(long)]
    crossover_length: Option<usize>,

    /// Write the config with the resulting decay curve as its [decay] section
    #[arg(long)]
    decay_out: Option<PathBuf>,
}

pub fn run(args: SynthesizeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(frames) = args.target_frames {
        config.synthesis.target_frames = frames;
    }
    if let Some(seed) = args.seed {
        config.synthesis.seed = seed;
    }
    if let Some(point) = args.crossover_point {
        config.synthesis.crossover_point = point;
    }
    if let Some(length) = args.crossover_length {
        config.synthesis.crossover_length = length;
    }
    config.validate()?;

    let recording = match impulse_path(args.impulse, &config) {
        Some(path) => Some(
            read_audio(&path).with_context(|| format!("reading impulse {}", path.display()))?,
        ),
        None => None,
    };
    let edit = config.decay_edit();
    if recording.is_none() && edit.is_none() {
        anyhow::bail!("Nothing to synthesize from. Use --impulse or a config with [decay]");
    }

    let synthesizer = ImpulseSynthesizer::new(config.synthesis_config())?;
    let synthesis = synthesizer.synthesize(recording.as_ref(), edit.as_ref())?;
    write_impulse(&args.output, &synthesis.impulse)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let impulse = &synthesis.impulse;
    println!("Synthesized impulse: {}", args.output.display());
    println!("  Channels:    {}", impulse.channels());
    println!("  Sample rate: {} Hz", impulse.sample_rate());
    println!(
        "  Length:      {} frames ({:.3}s)",
        impulse.frame_count(),
        impulse.frame_count() as f64 / f64::from(impulse.sample_rate())
    );

    if let Some(path) = args.decay_out {
        let display = synthesis
            .decay_display()
            .context("synthesis produced no decay curve")?;
        config.decay = Some(DecaySection {
            top: display.top,
            bottom: display.bottom,
        });
        config.save(&path)?;
        println!("  Decay curve: {}", path.display());
    }

    Ok(())
}
