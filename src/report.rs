// src/report.rs

use crate::model::{AnalysisReport, FileHistoryRecord};
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "Filepath,FirstCommitDate,LastCommitDate,LifespanDays";

const RESULTS_DIR: &str = "analysis_results";
const REPORT_FILE: &str = "egos_git_analysis.csv";

/// `<repo>/../analysis_results/egos_git_analysis.csv`
pub fn default_output_path(repo: &Path) -> PathBuf {
    let base = match repo.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => repo.join(".."),
    };
    base.join(RESULTS_DIR).join(REPORT_FILE)
}

/// Renders the whole report as CSV, header included.
pub fn encode(report: &AnalysisReport) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + report.records.len() * 80);
    out.push_str(HEADER);
    out.push('\n');
    for record in &report.records {
        push_row(&mut out, record);
    }
    out
}

/// Writes the report next to its final location and renames it into place,
/// so an interrupted run leaves no truncated file behind.
pub fn write_report(report: &AnalysisReport, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, encode(report))?;
    fs::rename(&tmp, path)
}

fn push_row(out: &mut String, record: &FileHistoryRecord) {
    let first = record.first_commit().map(|t| t.to_rfc3339()).unwrap_or_default();
    let last = record.last_commit().map(|t| t.to_rfc3339()).unwrap_or_default();
    let days = record.lifespan_days().map(format_days).unwrap_or_default();

    out.push_str(&escape(&record.path));
    for field in [first, last, days] {
        out.push(',');
        out.push_str(&field);
    }
    out.push('\n');
}

/// Always keeps a fractional part: `45.0`, `3.25`
fn format_days(days: f64) -> String {
    format!("{days:?}")
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
