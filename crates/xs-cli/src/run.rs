//! `xsec` run: chain the inputs, fold every weight, finalize.

use anyhow::{Context, Result};

use xs_core::{CancelToken, EventSource, RunConfig, RunningStats, Summary};
use xs_events::EventChain;

use crate::progress::ProgressCounter;

/// Compute the cross section of the event chain described by `config`.
///
/// The output name in `config` is never written here.
pub fn run(config: &RunConfig, cancel: &CancelToken) -> Result<Summary> {
    tracing::info!("opening {} input file(s)", config.inputs.len());
    tracing::debug!("output name: {}", config.output.display());

    let chain = EventChain::open(&config.inputs, &config.weight_column)
        .context("failed to open event chain")?;

    accumulate(chain, config, cancel)
}

/// Fold `source` into a fresh accumulator and finalize it.
///
/// `cancel` is checked before each record is read; once it is set the stream
/// is treated as ended and whatever was accumulated is still finalized.
pub fn accumulate<S: EventSource>(
    mut source: S,
    config: &RunConfig,
    cancel: &CancelToken,
) -> Result<Summary> {
    let declared = source.declared_entries();
    if let Some(entries) = declared {
        tracing::info!("Entries: {entries}");
    }

    let mut stats = RunningStats::new();
    let mut progress = ProgressCounter::new(declared);
    let mut interrupted = false;

    loop {
        if cancel.is_cancelled() {
            interrupted = true;
            break;
        }
        if config.max_events.is_some_and(|max| stats.count() >= max) {
            tracing::info!("stopping after {} events (--max-events)", stats.count());
            break;
        }
        let Some(record) = source.next() else {
            break;
        };
        let record = record.with_context(|| format!("failed to read event {}", stats.count()))?;

        if config.debug {
            tracing::debug!("{} {}", record.process_label(), record.weight);
        }
        stats.update(&record);
        progress.tick(stats.count());
    }
    drop(source);
    progress.finish(stats.count());

    let mut summary =
        stats.finalize(config.estimator).context("cannot compute cross section")?;
    summary.interrupted = interrupted;
    Ok(summary)
}
