// src/model.rs

use chrono::{DateTime, FixedOffset};

/// A path registered in the index, relative to the repository root
pub type TrackedFile = String;

/// Commit timestamps of one file, following renames, in no particular order
pub type CommitTimestamps = Vec<DateTime<FixedOffset>>;

/// What could be determined about a single file's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    Resolved {
        first: DateTime<FixedOffset>,
        last: DateTime<FixedOffset>,
    },
    /// The lookup worked but no commit touches the path
    NoCommits,
    Failed { reason: String },
}

/// Per-file summary, one row of the report
#[derive(Debug, Clone, PartialEq)]
pub struct FileHistoryRecord {
    pub path: TrackedFile,
    pub outcome: HistoryOutcome,
}

impl FileHistoryRecord {
    pub fn first_commit(&self) -> Option<DateTime<FixedOffset>> {
        match self.outcome {
            HistoryOutcome::Resolved { first, .. } => Some(first),
            _ => None,
        }
    }

    pub fn last_commit(&self) -> Option<DateTime<FixedOffset>> {
        match self.outcome {
            HistoryOutcome::Resolved { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Elapsed time between first and last commit, in fractional days
    pub fn lifespan_days(&self) -> Option<f64> {
        match self.outcome {
            HistoryOutcome::Resolved { first, last } => {
                let millis = (last - first).num_milliseconds() as f64;
                Some(millis / 1000.0 / 86_400.0)
            }
            _ => None,
        }
    }
}

/// The complete, write-once result of one analysis run
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub records: Vec<FileHistoryRecord>,
}

impl AnalysisReport {
    pub fn resolved(&self) -> usize {
        self.count(|o| matches!(o, HistoryOutcome::Resolved { .. }))
    }

    pub fn without_commits(&self) -> usize {
        self.count(|o| matches!(o, HistoryOutcome::NoCommits))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, HistoryOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&HistoryOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}
