//! Display WAV file metadata.

use aula_core::BlockLengthPlan;
use aula_io::{WavFormat, read_wav_info};
use clap::Args;

/// Display WAV file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    pub file: std::path::PathBuf,

    /// Minimum block length used to judge the file as an impulse
    #[arg(short, long, default_value_t = aula_core::DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.file)?;

    let format_str = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    };

    println!("File:        {}", args.file.display());
    println!("Format:      {} {}-bit", format_str, info.bits_per_sample);
    println!("Channels:    {}", info.channels);
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );

    let file_size = std::fs::metadata(&args.file)?.len();
    println!("File Size:   {}", format_bytes(file_size));

    let frames = (info.num_frames as usize)
        .max(4 * args.block_size)
        .next_power_of_two();
    if !(1..=2).contains(&info.channels) {
        println!("Impulse:     unusable ({} channels)", info.channels);
    } else if info.num_frames == 0 {
        println!("Impulse:     unusable (no frames)");
    } else {
        let plan = BlockLengthPlan::new(frames, args.block_size)?;
        println!(
            "Impulse:     {} frames padded, {} blocks, {} frames dropped",
            frames,
            plan.entry_count(),
            plan.dropped_tail()
        );
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
