// src/analyzer.rs

use crate::model::*;
use crate::report;
use crate::source::HistorySource;
use chrono::{DateTime, FixedOffset};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Fan per-file lookups out over the rayon pool
    pub parallel: bool,
    /// Log a notice every N processed files, 0 disables
    pub progress_every: usize,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { parallel: false, progress_every: 100, show_progress: false }
    }
}

/// Reduces a file's commit timestamps to its first/last commit.
pub fn summarize(path: &str, timestamps: &[DateTime<FixedOffset>]) -> FileHistoryRecord {
    let outcome = match (timestamps.iter().min(), timestamps.iter().max()) {
        (Some(&first), Some(&last)) => HistoryOutcome::Resolved { first, last },
        _ => HistoryOutcome::NoCommits,
    };
    FileHistoryRecord { path: path.to_string(), outcome }
}

/// Collects one record per tracked file. Never fails: listing errors give an
/// empty report, lookup errors give a `Failed` record for that file.
pub fn collect(source: &dyn HistorySource, options: &RunOptions) -> AnalysisReport {
    let files = match source.list_tracked_files() {
        Ok(files) => files,
        Err(e) => {
            error!(error = %e, "could not list tracked files");
            Vec::new()
        }
    };
    info!(files = files.len(), "collecting commit histories");

    let progress = Progress::new(files.len(), options);

    let records: Vec<FileHistoryRecord> = match source.batch_timestamps(&files) {
        Some(Ok(batch)) => files
            .iter()
            .zip(batch)
            .map(|(path, stamps)| progress.record(record_for(path, Ok(stamps))))
            .collect(),
        Some(Err(e)) => {
            error!(error = %e, "history walk failed");
            let reason = e.to_string();
            files
                .iter()
                .map(|path| progress.record(record_for(path, Err(reason.clone()))))
                .collect()
        }
        None if options.parallel => files
            .par_iter()
            .map(|path| progress.record(lookup(source, path)))
            .collect(),
        None => files
            .iter()
            .map(|path| progress.record(lookup(source, path)))
            .collect(),
    };

    progress.finish();
    AnalysisReport { records }
}

/// Collects the report and writes it to `output` as CSV.
pub fn run(
    source: &dyn HistorySource,
    options: &RunOptions,
    output: &Path,
) -> std::io::Result<AnalysisReport> {
    let analysis = collect(source, options);
    report::write_report(&analysis, output)?;
    Ok(analysis)
}

fn lookup(source: &dyn HistorySource, path: &str) -> FileHistoryRecord {
    record_for(path, source.commit_timestamps(path).map_err(|e| e.to_string()))
}

fn record_for(path: &str, stamps: Result<CommitTimestamps, String>) -> FileHistoryRecord {
    match stamps {
        Ok(stamps) => {
            let record = summarize(path, &stamps);
            if record.outcome == HistoryOutcome::NoCommits {
                warn!(path, "no commits found");
            }
            record
        }
        Err(reason) => {
            warn!(path, %reason, "history lookup failed");
            FileHistoryRecord {
                path: path.to_string(),
                outcome: HistoryOutcome::Failed { reason },
            }
        }
    }
}

struct Progress {
    bar: ProgressBar,
    total: usize,
    every: usize,
    done: AtomicUsize,
}

impl Progress {
    fn new(total: usize, options: &RunOptions) -> Self {
        let bar = if options.show_progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_message("Collecting histories");
        Self { bar, total, every: options.progress_every, done: AtomicUsize::new(0) }
    }

    fn record(&self, record: FileHistoryRecord) -> FileHistoryRecord {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.inc(1);
        if notice_due(done, self.every) {
            info!(processed = done, total = self.total, "progress");
        }
        record
    }

    fn finish(&self) {
        self.bar.finish_with_message("Histories collected");
    }
}

fn notice_due(done: usize, every: usize) -> bool {
    every > 0 && done % every == 0
}
