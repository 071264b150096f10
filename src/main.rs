use clap::{Parser, Subcommand};
use matching_engine::simulate::{self, SimConfig};
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "matching-engine")]
#[command(
    version = "0.1",
    about = "Price-time-priority matching core with a simulated feed harness"
)]
struct Cli {
    /// Log verbosity
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate noisy order flow and drive it through the engine
    Simulate {
        /// Number of limit orders to generate
        #[arg(long, default_value_t = 100_000)]
        orders: u64,

        /// RNG seed; the same seed reproduces the exact feed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Starting mid price
        #[arg(long, default_value_t = 50.0)]
        mid: f64,

        /// Std-dev of the per-tick mid drift
        #[arg(long, default_value_t = 0.5)]
        sigma: f64,

        /// Average order size
        #[arg(long, default_value_t = 8.0)]
        mean_qty: f64,

        /// Distance from the mid at which orders are quoted
        #[arg(long, default_value_t = 1.0)]
        spread: f64,

        /// Chance that a tick also cancels a random live order
        #[arg(long, default_value_t = 0.25)]
        cancel_prob: f64,

        /// Record the generated feed to this file as JSON lines
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Replay a recorded feed file through a fresh engine
    Replay {
        /// Feed file written by `simulate --record`
        feed: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (summary, elapsed) = match cli.command {
        Commands::Simulate {
            orders,
            seed,
            mid,
            sigma,
            mean_qty,
            spread,
            cancel_prob,
            record,
        } => {
            let cfg = SimConfig {
                orders,
                mid,
                noise_sigma: sigma,
                mean_qty,
                spread,
                cancel_prob,
                seed,
            };
            let started = Instant::now();
            let summary = simulate::run_simulation(&cfg, record.as_deref())?;
            (summary, started.elapsed())
        }
        Commands::Replay { feed } => {
            let started = Instant::now();
            let summary = simulate::replay_feed(&feed)?;
            (summary, started.elapsed())
        }
    };

    tracing::info!(
        elapsed = format_args!("{:.3}s", elapsed.as_secs_f64()),
        "run complete"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
