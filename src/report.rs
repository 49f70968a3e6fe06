use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::records::FailureRecord;

/// Emits the end-of-run verdict. No failures: a success notice and no file.
/// Otherwise the fixed-format Markdown report, overwritten each run, one
/// table row per failure in insertion order.
pub fn emit_report(failures: &[FailureRecord], path: &Path) -> anyhow::Result<()> {
    if failures.is_empty() {
        tracing::info!("all submitted forms downloaded successfully");
        return Ok(());
    }

    let mut body = String::new();
    writeln!(body, "# Missing LE Form Report")?;
    writeln!(body)?;
    writeln!(body, "Total Missing: {}", failures.len())?;
    writeln!(body)?;
    writeln!(body, "| Semester | Course | Student | Reason |")?;
    writeln!(body, "|---|---|---|---|")?;
    for failure in failures {
        writeln!(
            body,
            "| {} | {} | {} | {} |",
            failure.period, failure.course, failure.student, failure.reason
        )?;
    }

    let mut out = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create report: {}", path.display()))?;
    out.write_all(body.as_bytes())
        .with_context(|| format!("write report: {}", path.display()))?;
    out.flush().context("flush report")?;

    tracing::info!(path = %path.display(), total = failures.len(), "report generated");
    Ok(())
}
