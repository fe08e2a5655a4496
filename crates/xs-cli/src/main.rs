//! xsec CLI

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use xs_core::{CancelToken, Estimator, RunConfig};

mod progress;
mod run;

#[derive(Parser)]
#[command(name = "xsec")]
#[command(about = "Cross section and its statistical error from a chain of weighted event files")]
#[command(version)]
struct Cli {
    /// Input event files (Parquet), read in order as one chain
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Output name. Accepted for compatibility; the XS line always goes to stdout.
    #[arg(short, long, default_value = xs_core::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Debug output: log the subprocess label and weight of every event
    #[arg(short, long)]
    debug: bool,

    /// Column holding the event weight
    #[arg(
        long = "weight",
        value_name = "COLUMN",
        default_value = xs_core::DEFAULT_WEIGHT_COLUMN
    )]
    weight_column: String,

    /// Use the numerically stable (Welford) error estimator instead of the raw-sum formula
    #[arg(long)]
    stable: bool,

    /// Stop after N events
    #[arg(long, value_name = "N")]
    max_events: Option<u64>,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
}

impl Cli {
    fn into_config(self) -> xs_core::Result<RunConfig> {
        let estimator = if self.stable { Estimator::Welford } else { Estimator::Naive };
        Ok(RunConfig::new(self.inputs)?
            .with_output(self.output)
            .with_debug(self.debug)
            .with_weight_column(self.weight_column)?
            .with_estimator(estimator)
            .with_max_events(self.max_events))
    }
}

/// First Ctrl-C stops the event loop gracefully; a second one exits immediately.
fn install_interrupt_handler(cancel: &CancelToken) -> Result<(), ctrlc::Error> {
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        token.cancel();
    })
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<xs_core::Error>() {
        Some(e) if e.is_usage() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { cli.log_level.max(tracing::Level::DEBUG) } else { cli.log_level };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => Cli::command().error(ErrorKind::InvalidValue, e).exit(),
    };

    let cancel = CancelToken::new();
    if let Err(e) = install_interrupt_handler(&cancel) {
        tracing::warn!("Ctrl-C handler not installed: {e}");
    }

    match run::run(&config, &cancel) {
        Ok(summary) => {
            if summary.interrupted {
                let n = summary.count;
                tracing::warn!("interrupted: cross section from the first {n} events");
            }
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code(&e)
        }
    }
}
