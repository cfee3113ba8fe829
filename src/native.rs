// src/native.rs

use crate::error::{HistoryError, Result};
use crate::model::{CommitTimestamps, TrackedFile};
use crate::source::HistorySource;
use chrono::{DateTime, FixedOffset, TimeZone};
use git2::{Commit, Delta, DiffFindOptions, DiffOptions, ErrorCode, Oid, Repository, Tree};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Reads history straight from the object database.
///
/// All tracked files are resolved in a single walk over the commit graph
/// instead of one `git log` process per file. `root` must be the top level
/// of the working tree.
pub struct Libgit2 {
    root: PathBuf,
}

impl Libgit2 {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn open(&self) -> Result<Repository> {
        Repository::open(&self.root).map_err(|e| match e.code() {
            ErrorCode::NotFound => HistoryError::NotARepository(self.root.clone()),
            _ => e.into(),
        })
    }

    /// Walks from HEAD back to the root commits, newest first, attributing
    /// each commit to every tracked file whose path (as of that commit) it
    /// touches. Renames move the lookup key to the old path, so commits made
    /// before a rename still count for the current file.
    fn walk(&self, files: &[TrackedFile]) -> Result<Vec<CommitTimestamps>> {
        let repo = self.open()?;
        let mut stamps: Vec<CommitTimestamps> = vec![Vec::new(); files.len()];

        match repo.head() {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(stamps),
            Err(e) => return Err(e.into()),
        }

        let mut keys: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, path) in files.iter().enumerate() {
            keys.entry(path.clone()).or_default().push(idx);
        }
        let mut last_seen: Vec<Option<Oid>> = vec![None; files.len()];

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.include_untracked(false);
        diff_opts.ignore_filemode(true);

        for oid in revwalk {
            let oid = oid?;
            let commit = repo.find_commit(oid)?;
            let when = commit_time(&commit)?;
            let tree = commit.tree()?;
            let parents = commit
                .parents()
                .map(|p| p.tree())
                .collect::<std::result::Result<Vec<Tree>, _>>()?;

            let mut diff =
                repo.diff_tree_to_tree(parents.first(), Some(&tree), Some(&mut diff_opts))?;
            diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

            let is_merge = parents.len() > 1;
            let mut renames = Vec::new();

            for delta in diff.deltas() {
                let path = match delta.status() {
                    Delta::Deleted => delta.old_file().path(),
                    _ => delta.new_file().path(),
                };
                let Some(path) = path.and_then(|p| p.to_str()) else { continue };
                let Some(ids) = keys.get(path) else { continue };

                // A merge only counts when it differs from every parent
                if is_merge && parents[1..].iter().any(|p| same_entry(p, &tree, path)) {
                    continue;
                }

                for &id in ids {
                    if last_seen[id] != Some(oid) {
                        last_seen[id] = Some(oid);
                        stamps[id].push(when);
                    }
                }

                if delta.status() == Delta::Renamed && !is_merge {
                    if let Some(old) = delta.old_file().path().and_then(|p| p.to_str()) {
                        renames.push((path.to_string(), old.to_string()));
                    }
                }
            }

            for (new, old) in renames {
                if let Some(ids) = keys.remove(&new) {
                    keys.entry(old).or_default().extend(ids);
                }
            }
        }

        Ok(stamps)
    }
}

impl HistorySource for Libgit2 {
    fn list_tracked_files(&self) -> Result<Vec<TrackedFile>> {
        let repo = self.open()?;
        let index = repo.index()?;
        let mut files: Vec<TrackedFile> = index
            .iter()
            .map(|entry| match String::from_utf8(entry.path) {
                Ok(path) => path,
                Err(e) => {
                    let path = String::from_utf8_lossy(e.as_bytes()).into_owned();
                    warn!(path = %path, "path is not valid UTF-8, its history cannot be looked up");
                    path
                }
            })
            .collect();
        // conflicted paths appear once per stage
        files.dedup();
        Ok(files)
    }

    fn commit_timestamps(&self, path: &str) -> Result<CommitTimestamps> {
        let mut stamps = self.walk(&[path.to_string()])?;
        Ok(stamps.pop().unwrap_or_default())
    }

    fn batch_timestamps(&self, files: &[TrackedFile]) -> Option<Result<Vec<CommitTimestamps>>> {
        Some(self.walk(files))
    }
}

fn same_entry(a: &Tree, b: &Tree, path: &str) -> bool {
    let id = |t: &Tree| t.get_path(Path::new(path)).ok().map(|e| e.id());
    id(a) == id(b)
}

/// Committer time in the committer's own offset, like `git log --format=%cI`
fn commit_time(commit: &Commit) -> Result<DateTime<FixedOffset>> {
    let time = commit.time();
    let invalid = || HistoryError::InvalidTime {
        seconds: time.seconds(),
        offset_minutes: time.offset_minutes(),
    };
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).ok_or_else(invalid)?;
    offset.timestamp_opt(time.seconds(), 0).single().ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_cli::GitCli;
    use crate::test_support::TempRepo;

    fn rendered(mut stamps: CommitTimestamps) -> Vec<String> {
        stamps.sort();
        stamps.iter().map(|t| t.to_rfc3339()).collect()
    }

    fn renamed_repo() -> TempRepo {
        let repo = TempRepo::new();
        repo.write("old.txt", "alpha\nbeta\ngamma\ndelta\n");
        repo.write("other.txt", "unrelated\n");
        repo.git(&["add", "old.txt", "other.txt"]);
        repo.commit_at("add", "2024-07-01T00:00:00+00:00");
        repo.write("other.txt", "unrelated, edited\n");
        repo.git(&["add", "other.txt"]);
        repo.commit_at("edit other", "2024-07-05T12:00:00+02:00");
        repo.git(&["mv", "old.txt", "new.txt"]);
        repo.commit_at("rename", "2024-07-11T00:00:00+00:00");
        repo
    }

    #[test]
    fn lists_index_entries() {
        let repo = renamed_repo();
        let files = Libgit2::new(repo.path()).list_tracked_files().unwrap();
        assert_eq!(files, vec!["new.txt", "other.txt"]);
    }

    #[test]
    fn batch_walk_follows_renames() {
        let repo = renamed_repo();
        let source = Libgit2::new(repo.path());
        let files = vec!["new.txt".to_string(), "other.txt".to_string()];
        let mut stamps = source.batch_timestamps(&files).unwrap().unwrap();

        let other = rendered(stamps.pop().unwrap());
        let new = rendered(stamps.pop().unwrap());
        assert_eq!(new, vec!["2024-07-01T00:00:00+00:00", "2024-07-11T00:00:00+00:00"]);
        assert_eq!(other, vec!["2024-07-01T00:00:00+00:00", "2024-07-05T12:00:00+02:00"]);
    }

    #[test]
    fn agrees_with_git_log() {
        let repo = renamed_repo();
        let native = Libgit2::new(repo.path());
        let cli = GitCli::new(repo.path());
        for path in ["new.txt", "other.txt"] {
            assert_eq!(
                rendered(native.commit_timestamps(path).unwrap()),
                rendered(cli.commit_timestamps(path).unwrap()),
                "{path}"
            );
        }
    }

    #[test]
    fn bracketed_names_match_git_log() {
        let repo = TempRepo::new();
        repo.write("a.txt", "plain\n");
        repo.git(&["add", "a.txt"]);
        repo.commit_at("plain", "2024-01-01T00:00:00+00:00");
        repo.write("[ab].txt", "bracketed\n");
        repo.git(&["add", "--", "[ab].txt"]);
        repo.commit_at("bracketed", "2024-06-01T00:00:00+00:00");

        let native = Libgit2::new(repo.path()).commit_timestamps("[ab].txt").unwrap();
        let cli = GitCli::new(repo.path()).commit_timestamps("[ab].txt").unwrap();
        assert_eq!(rendered(native), vec!["2024-06-01T00:00:00+00:00"]);
        assert_eq!(rendered(cli), vec!["2024-06-01T00:00:00+00:00"]);
    }

    #[test]
    fn unborn_head_has_no_history() {
        let repo = TempRepo::new();
        repo.write("staged.txt", "not committed yet\n");
        repo.git(&["add", "staged.txt"]);

        let source = Libgit2::new(repo.path());
        assert_eq!(source.list_tracked_files().unwrap(), vec!["staged.txt"]);
        assert!(source.commit_timestamps("staged.txt").unwrap().is_empty());
    }

    #[test]
    fn missing_repository_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Libgit2::new(dir.path()).list_tracked_files().unwrap_err();
        assert!(matches!(err, HistoryError::NotARepository(_)));
    }
}
