// src/main.rs

mod analyzer;
mod cli;
mod error;
mod git_cli;
mod model;
mod native;
mod report;
mod source;
#[cfg(test)]
mod test_support;

use anyhow::Context;
use clap::Parser;
use cli::{Args, Backend};
use source::HistorySource;
use std::io::IsTerminal;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let start_time = Instant::now();

    let repo = match source::discover_root(&args.repo) {
        Ok(root) => root,
        Err(e) => {
            // listing fails later and yields a header-only report
            warn!(repo = %args.repo.display(), error = %e, "could not locate the working tree");
            args.repo.canonicalize().unwrap_or_else(|_| args.repo.clone())
        }
    };
    let output = args.output.clone().unwrap_or_else(|| report::default_output_path(&repo));
    info!(repo = %repo.display(), backend = ?args.backend, "analyzing repository");

    let source: Box<dyn HistorySource> = match args.backend {
        Backend::Cli => Box::new(git_cli::GitCli::new(&repo)),
        Backend::Native => {
            if args.parallel {
                warn!("--parallel has no effect with the native backend");
            }
            Box::new(native::Libgit2::new(&repo))
        }
    };

    let options = analyzer::RunOptions {
        parallel: args.parallel,
        progress_every: args.progress_every,
        show_progress: !args.no_progress && std::io::stderr().is_terminal(),
    };

    let report = analyzer::run(source.as_ref(), &options, &output)
        .with_context(|| format!("failed to write report to {}", output.display()))?;

    info!(
        rows = report.records.len(),
        resolved = report.resolved(),
        without_commits = report.without_commits(),
        failed = report.failed(),
        output = %output.display(),
        "report written in {:.2?}",
        start_time.elapsed()
    );
    Ok(())
}
