// src/git_cli.rs

use crate::error::{HistoryError, Result};
use crate::model::{CommitTimestamps, TrackedFile};
use crate::source::HistorySource;
use chrono::DateTime;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::warn;

/// Reads history by running the `git` binary inside the checkout.
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn git(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new("git")
            .args(args)
            // tracked paths such as `[id].tsx` must not act as globs
            .env("GIT_LITERAL_PATHSPECS", "1")
            .current_dir(&self.root)
            .output()
            .map_err(HistoryError::Spawn)?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(HistoryError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl HistorySource for GitCli {
    fn list_tracked_files(&self) -> Result<Vec<TrackedFile>> {
        // -z keeps paths with unusual characters unquoted
        let out = self.git(&["ls-files", "-z"])?;
        Ok(split_nul(&out))
    }

    fn commit_timestamps(&self, path: &str) -> Result<CommitTimestamps> {
        let out = self.git(&["log", "--follow", "--format=%cI", "--", path])?;
        parse_timestamps(&String::from_utf8_lossy(&out))
    }
}

fn split_nul(out: &[u8]) -> Vec<TrackedFile> {
    out.split(|&b| b == 0)
        .filter(|p| !p.is_empty())
        .map(|raw| match std::str::from_utf8(raw) {
            Ok(path) => path.to_string(),
            Err(_) => {
                let path = String::from_utf8_lossy(raw).into_owned();
                warn!(path = %path, "path is not valid UTF-8, its history cannot be looked up");
                path
            }
        })
        .collect()
}

/// Parses one strict ISO-8601 timestamp per line, skipping blank lines.
pub fn parse_timestamps(out: &str) -> Result<CommitTimestamps> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            DateTime::parse_from_rfc3339(line).map_err(|source| HistoryError::Timestamp {
                value: line.to_string(),
                source,
            })
        })
        .collect()
}
