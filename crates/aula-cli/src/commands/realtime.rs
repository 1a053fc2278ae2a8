//! Real-time convolution command.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use aula_io::{DuplexConfig, DuplexStream, read_audio};
use aula_synth::{ConvolutionReverb, ImpulseMode};
use clap::Args;

use super::common::{impulse_path, load_config};

/// How often the controller checks for a resynthesis request.
const SERVICE_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct RealtimeArgs {
    /// Recorded impulse (WAV); defaults to the configured one
    #[arg(short, long)]
    impulse: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wet percentage (0-100)
    #[arg(short, long)]
    mix: Option<f32>,

    /// Minimum block length in frames
    #[arg(short, long)]
    block_size: Option<usize>,

    /// Convolve with a synthesized impulse instead of the recording
    #[arg(short, long)]
    synthesize: bool,

    /// Single output channel
    #[arg(long)]
    mono: bool,

    /// Input device name or index
    #[arg(long)]
    input_device: Option<String>,

    /// Output device name or index
    #[arg(long)]
    output_device: Option<String>,
}

pub fn run(args: RealtimeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(mix) = args.mix {
        config.engine.mix = mix;
    }
    if let Some(block_size) = args.block_size {
        config.engine.block_size = block_size;
    }
    if args.mono {
        config.engine.channels = 1;
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
        anyhow::bail!("No impulse. Use --impulse or set [impulse] path or [decay] in the config");
    }

    let mut stream = DuplexStream::new(DuplexConfig {
        block_size: config.engine.block_size,
        engine_channels: config.engine.channels,
        input_device: args.input_device,
        output_device: args.output_device,
    })?;

    let sample_rate = stream.sample_rate();
    if let Some(recording) = &recording
        && recording.sample_rate() != sample_rate
    {
        tracing::warn!(
            impulse = recording.sample_rate(),
            device = sample_rate,
            "impulse sample rate differs from the device; playing without conversion"
        );
    }

    let mut engine_config = config.engine_config();
    engine_config.sample_rate = sample_rate;
    let mut synthesis_config = config.synthesis_config();
    synthesis_config.sample_rate = sample_rate;

    let mode = if args.synthesize || config.impulse.synthesize {
        ImpulseMode::Synthesized
    } else {
        ImpulseMode::Recorded
    };

    let reverb = ConvolutionReverb::new(engine_config, synthesis_config, recording, edit, mode)?;
    let engine = reverb.engine();
    println!("Real-time convolution");
    println!("  Impulse:     {} frames", engine.plan().frame_count());
    println!("  Blocks:      {}", engine.plan().entry_count());
    println!("  Block size:  {} frames", engine.block_size());
    println!(
        "  Latency:     {} frames ({:.2} ms)",
        engine.latency_frames(),
        engine.latency_frames() as f64 * 1000.0 / f64::from(sample_rate)
    );
    println!("  Workers:     {}", engine.worker_count());
    println!("  Mix:         {}%", engine.controls().mix());
    println!("\nPress Ctrl+C to stop...\n");

    let (mut engine, mut controller) = reverb.split();

    let running = stream.running_flag();
    let servicing = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let servicing = Arc::clone(&servicing);
        ctrlc::set_handler(move || {
            println!("\nStopping...");
            servicing.store(false, Ordering::SeqCst);
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let service = {
        let servicing = Arc::clone(&servicing);
        std::thread::Builder::new()
            .name("aula-resynth".into())
            .spawn(move || {
                while servicing.load(Ordering::SeqCst) {
                    if let Err(err) = controller.service() {
                        tracing::error!(%err, "resynthesis failed");
                    }
                    std::thread::sleep(SERVICE_INTERVAL);
                }
            })?
    };

    stream.run(move |input, output| {
        if let Err(err) = engine.process_block(input, output) {
            output.fill(0.0);
            tracing::error!(%err, "cycle failed");
        }
    })?;

    servicing.store(false, Ordering::SeqCst);
    if service.join().is_err() {
        tracing::error!("resynthesis thread panicked");
    }

    println!("Done!");
    Ok(())
}
