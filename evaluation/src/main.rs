//! Evaluation runner binary.
//!
//! Loads two trace archives, runs K-fold cross-validation, and prints the
//! per-fold and aggregate results. All harness logic lives in the library;
//! this binary only resolves paths and builds the run configuration.
//!
//! Usage:
//!   cargo run --bin evaluation -- path/to/first path/to/second
//!   cargo run --bin evaluation -- first second -l 2000 --open-world 0.5

use clap::Parser;
use std::path::PathBuf;
use tracedist_evaluation::config::RunConfig;
use tracedist_evaluation::controller;
use tracedist_evaluation::datasets::load_store;

#[derive(Parser)]
#[command(name = "evaluation", about = "Trace distinguishability evaluation")]
struct Cli {
    /// First trace archive directory (label 0).
    dataset1: PathBuf,

    /// Second trace archive directory (label 1).
    dataset2: PathBuf,

    /// Length of the traces.
    #[arg(short = 'l', long, default_value_t = 5000)]
    length: usize,

    /// Open world mode with the given train split probability (0 disables).
    #[arg(long = "open-world", default_value_t = 0.0)]
    open_world: f64,

    /// Mini-batch size.
    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    /// Epoch cap per fold.
    #[arg(long, default_value_t = 200)]
    epochs: usize,

    /// Number of cross-validation folds.
    #[arg(long, default_value_t = 10)]
    folds: usize,

    /// Seed for all run randomness.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = RunConfig {
        trace_len: cli.length,
        open_world: cli.open_world,
        batch_size: cli.batch_size,
        max_epochs: cli.epochs,
        folds: cli.folds,
        seed: cli.seed,
        ..RunConfig::default()
    };
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let store = match load_store(&cli.dataset1, &cli.dataset2, config.trace_len) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = controller::run(&store, &config) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
