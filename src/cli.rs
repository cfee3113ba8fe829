// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the git checkout to analyze
    #[arg(short, long, env = "GIT_LIFESPAN_REPO", default_value = ".")]
    pub repo: PathBuf,

    /// Where to write the CSV report
    /// (defaults to <repo>/../analysis_results/egos_git_analysis.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How commit histories are read
    #[arg(long, value_enum, default_value_t = Backend::Cli)]
    pub backend: Backend,

    /// Query per-file histories on a thread pool (cli backend only)
    #[arg(long)]
    pub parallel: bool,

    /// Log a progress notice every N files, 0 to disable
    #[arg(long, default_value_t = 100)]
    pub progress_every: usize,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Shell out to `git ls-files` and `git log --follow` per file
    Cli,
    /// Read the object database with libgit2 in a single history walk
    Native,
}
