//! Show the block plan for an impulse.

use std::path::PathBuf;

use anyhow::Context;
use aula_core::{BlockLengthPlan, Parity};
use aula_io::read_impulse;
use clap::Args;

use super::common::load_config;

#[derive(Args)]
pub struct PlanArgs {
    /// Impulse file (WAV); padded as the engine would pad it
    #[arg(short, long, conflicts_with = "frames")]
    impulse: Option<PathBuf>,

    /// Impulse length in frames (power of two)
    #[arg(short, long)]
    frames: Option<usize>,

    /// Minimum block length in frames
    #[arg(short, long)]
    block_size: Option<usize>,

    /// Sample rate used for timing figures
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn parity_name(parity: Parity) -> &'static str {
    match parity {
        Parity::Odd => "odd",
        Parity::Even => "even",
    }
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let block_size = args.block_size.unwrap_or(config.engine.block_size);
    let sample_rate = args.sample_rate.unwrap_or(config.engine.sample_rate);

    let frames = match (&args.impulse, args.frames) {
        (Some(path), _) => read_impulse(path, 4 * block_size)
            .with_context(|| format!("reading impulse {}", path.display()))?
            .frame_count(),
        (None, Some(frames)) => frames,
        (None, None) => anyhow::bail!("Give --impulse or --frames"),
    };

    let plan = BlockLengthPlan::new(frames, block_size)?;

    if args.json {
        let entries: Vec<_> = plan
            .entries()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "index": e.index,
                    "factor": e.factor,
                    "parity": parity_name(e.parity),
                    "offset": e.offset,
                    "len": e.len,
                    "cycles_until_due": e.cycles_until_due(),
                    "fft_size": e.fft_size(),
                })
            })
            .collect();
        let report = serde_json::json!({
            "frame_count": plan.frame_count(),
            "block_size": plan.block_size(),
            "max_factor": plan.max_factor(),
            "cycle_period": plan.cycle_period(),
            "covered_frames": plan.covered_frames(),
            "dropped_tail": plan.dropped_tail(),
            "history_len": plan.history_len(),
            "accumulator_len": plan.accumulator_len(),
            "latency_frames": plan.block_size(),
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let ms = |frames: usize| frames as f64 * 1000.0 / f64::from(sample_rate);

    println!(
        "Block plan: {} frames, B = {}",
        plan.frame_count(),
        plan.block_size()
    );
    println!("=================================\n");
    println!(
        "{:>5}  {:>6}  {:>4}  {:>9}  {:>7}  {:>5}  {:>8}",
        "block", "factor", "pair", "offset", "len", "wait", "fft"
    );
    for e in plan.entries() {
        println!(
            "{:>5}  {:>6}  {:>4}  {:>9}  {:>7}  {:>5}  {:>8}",
            e.index,
            e.factor,
            parity_name(e.parity),
            e.offset,
            e.len,
            e.cycles_until_due(),
            e.fft_size()
        );
    }
    println!();
    println!(
        "Covered:      {} frames ({:.1} ms)",
        plan.covered_frames(),
        ms(plan.covered_frames())
    );
    println!("Dropped tail: {} frames", plan.dropped_tail());
    println!("Cycle period: {} cycles", plan.cycle_period());
    println!("History:      {} frames", plan.history_len());
    println!("Accumulator:  {} frames", plan.accumulator_len());
    println!(
        "Latency:      {} frames ({:.2} ms at {} Hz)",
        plan.block_size(),
        ms(plan.block_size()),
        sample_rate
    );

    Ok(())
}
