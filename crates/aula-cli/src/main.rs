//! Aula CLI - real-time convolution reverb from the command line.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aula")]
#[command(author, version, about = "Real-time partitioned convolution reverb", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reverb on live audio
    Realtime(commands::realtime::RealtimeArgs),

    /// Synthesize an impulse and write it to a WAV file
    Synthesize(commands::synthesize::SynthesizeArgs),

    /// Show how an impulse is split into blocks
    Plan(commands::plan::PlanArgs),

    /// Display WAV file metadata
    Info(commands::info::InfoArgs),

    /// List audio devices
    Devices(commands::devices::DevicesArgs),

    /// Print or write the configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Realtime(args) => commands::realtime::run(args),
        Commands::Synthesize(args) => commands::synthesize::run(args),
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
