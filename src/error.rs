// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("unparseable commit timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("commit time {seconds}s with offset {offset_minutes}min is out of range")]
    InvalidTime { seconds: i64, offset_minutes: i32 },

    #[error("libgit2: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
