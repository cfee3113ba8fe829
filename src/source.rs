// src/source.rs

use crate::error::{HistoryError, Result};
use crate::model::{CommitTimestamps, TrackedFile};
use git2::{ErrorCode, Repository};
use std::path::{Path, PathBuf};

/// Where tracked paths and their commit histories come from.
///
/// Implementations are queried from several threads when per-file
/// lookups run in parallel, hence the `Sync` bound.
pub trait HistorySource: Sync {
    /// Paths currently in the index, in the order the backend reports them
    fn list_tracked_files(&self) -> Result<Vec<TrackedFile>>;

    /// Commit timestamps touching `path`, following renames
    fn commit_timestamps(&self, path: &str) -> Result<CommitTimestamps>;

    /// Resolve all files at once when the backend can do better than one
    /// query per file. Returns `None` to fall back to `commit_timestamps`.
    fn batch_timestamps(&self, _files: &[TrackedFile]) -> Option<Result<Vec<CommitTimestamps>>> {
        None
    }
}

/// Top level of the working tree containing `start`, which may be any
/// directory inside the checkout.
pub fn discover_root(start: &Path) -> Result<PathBuf> {
    let repo = Repository::discover(start).map_err(|e| match e.code() {
        ErrorCode::NotFound => HistoryError::NotARepository(start.to_path_buf()),
        _ => e.into(),
    })?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| HistoryError::NotARepository(start.to_path_buf()))?;
    Ok(workdir.canonicalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{collect, RunOptions};
    use crate::git_cli::GitCli;
    use crate::native::Libgit2;
    use crate::report::{default_output_path, encode};
    use crate::test_support::TempRepo;

    fn nested_repo() -> TempRepo {
        let repo = TempRepo::new();
        repo.write("top.txt", "top\n");
        repo.write("sub/inner.txt", "inner\n");
        repo.git(&["add", "top.txt", "sub/inner.txt"]);
        repo.commit_at("initial", "2024-07-01T00:00:00+00:00");
        repo
    }

    #[test]
    fn root_is_found_from_a_subdirectory() {
        let repo = nested_repo();
        let top = repo.path().canonicalize().unwrap();

        let root = discover_root(&repo.path().join("sub")).unwrap();
        assert_eq!(root, top);
        assert_eq!(
            default_output_path(&root),
            top.parent().unwrap().join("analysis_results").join("egos_git_analysis.csv")
        );

        let cli = collect(&GitCli::new(&root), &RunOptions::default());
        let native = collect(&Libgit2::new(&root), &RunOptions::default());
        let paths: Vec<_> = cli.records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["sub/inner.txt", "top.txt"]);
        assert_eq!(encode(&cli), encode(&native));
    }

    #[test]
    fn plain_directory_is_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_root(dir.path()).is_err());
    }
}
