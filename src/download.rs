use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::driver::{DriverError, DriverErrorKind, Locator, UiDriver, UiElement};
use crate::fetch::{FetchError, Fetcher};
use crate::paths::{self, DownloadTarget};
use crate::periods::PeriodSelector;
use crate::records::{CandidateRecord, FailureRecord, WorkList};
use crate::scan::{self, COL_STATUS, RowIndex, SUBMITTED_MARKER};
use crate::session::{self, SessionGuard};

const ROW_NOT_FOUND: &str = "Row not found in re-scan";
const TIMEOUT_REASON: &str = "Timeout/Missing File";

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub root: PathBuf,
    /// Wait after selecting a semester for the table to re-render.
    pub settle: Duration,
    /// Wait after a go-back navigation.
    pub nav_settle: Duration,
    /// Substring identifying the working listing view's URL.
    pub listing_marker: String,
}

#[derive(Debug, Error)]
enum RowError {
    #[error("{0}")]
    Driver(#[from] DriverError),
    #[error("{0}")]
    Fetch(#[from] FetchError),
}

enum RowOutcome {
    Downloaded(PathBuf),
    NoLongerSubmitted,
}

/// What to do about a failed row before moving on, dispatched on the typed
/// error kind plus the two location predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    /// Handles may be dead; rebuild the row index in place.
    RebuildIndex,
    /// The browser drifted onto an error page; go back, then rebuild.
    GoBackAndRebuild,
    /// Redirected to login: rebuild now, re-authenticate at the next
    /// session-guard checkpoint.
    AwaitRelogin,
    None,
}

fn plan_recovery(err: &RowError, current_url: &str, listing_marker: &str) -> Recovery {
    if session::is_login_url(current_url) {
        return Recovery::AwaitRelogin;
    }

    let stale = matches!(
        err,
        RowError::Driver(driver_err) if driver_err.kind() == DriverErrorKind::Stale
    );
    if !session::is_listing_url(current_url, listing_marker) {
        Recovery::GoBackAndRebuild
    } else if stale {
        Recovery::RebuildIndex
    } else {
        Recovery::None
    }
}

/// Works through the discovered list one semester group at a time. Every
/// record ends as a download, a deliberate skip, or a failure record —
/// nothing is dropped on the floor, including records stranded behind a
/// semester-level error.
pub async fn download_all(
    driver: &Arc<dyn UiDriver>,
    guard: &SessionGuard,
    periods: &PeriodSelector,
    fetcher: &Fetcher,
    work: &WorkList,
    config: &DownloadConfig,
) -> Vec<FailureRecord> {
    let mut failures = Vec::new();
    for (period, records) in work.by_period() {
        tracing::info!(semester = %period, forms = records.len(), "processing semester");
        download_period(driver, guard, periods, fetcher, &period, &records, config, &mut failures)
            .await;
    }
    tracing::info!(failures = failures.len(), "done downloading");
    failures
}

#[allow(clippy::too_many_arguments)]
async fn download_period(
    driver: &Arc<dyn UiDriver>,
    guard: &SessionGuard,
    periods: &PeriodSelector,
    fetcher: &Fetcher,
    period: &str,
    records: &[CandidateRecord],
    config: &DownloadConfig,
    failures: &mut Vec<FailureRecord>,
) {
    guard.ensure_logged_in().await;

    let mut rows = match prepare_period(driver, periods, period).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(semester = %period, error = %err, "semester setup failed; recovering");
            for record in records {
                failures.push(failure(record, format!("Semester processing failed: {err}")));
            }
            guard.recover_to_listing().await;
            return;
        }
    };

    for record in records {
        let target = DownloadTarget::for_record(&config.root, record);
        let student = paths::student_display(&record.first_name, &record.last_name);

        if let Err(err) = std::fs::create_dir_all(&target.dir) {
            failures.push(failure(record, format!("Error: {err}")));
            continue;
        }
        match paths::has_existing_download(&target.dir, &target.file_prefix) {
            Ok(true) => {
                tracing::info!(course = %record.course, student = %student, "already downloaded; skipping");
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                failures.push(failure(record, format!("Error: {err:#}")));
                continue;
            }
        }

        let Some(row) = rows.get(&record.row_key()) else {
            tracing::warn!(
                course = %record.course,
                student = %student,
                "row disappeared between discovery and download"
            );
            failures.push(failure(record, ROW_NOT_FOUND));
            continue;
        };

        match fetch_row(row.as_ref(), &target, fetcher).await {
            Ok(RowOutcome::Downloaded(path)) => {
                tracing::info!(path = %path.display(), "downloaded");
            }
            Ok(RowOutcome::NoLongerSubmitted) => {
                tracing::warn!(
                    course = %record.course,
                    student = %student,
                    "no longer marked as submitted; skipping"
                );
            }
            Err(RowError::Fetch(err)) if err.is_timeout() => {
                tracing::warn!(student = %student, error = %err, "download timed out");
                failures.push(failure(record, TIMEOUT_REASON));

                let url = current_url(driver.as_ref()).await;
                if !session::is_listing_url(&url, &config.listing_marker) {
                    tracing::info!("error page detected; going back");
                    go_back(driver.as_ref(), config.nav_settle).await;
                    rows = rebuild_index(driver.as_ref()).await;
                }
            }
            Err(err) => {
                tracing::warn!(
                    course = %record.course,
                    student = %student,
                    error = %err,
                    "download failed"
                );
                failures.push(failure(record, format!("Error: {err}")));

                let url = current_url(driver.as_ref()).await;
                match plan_recovery(&err, &url, &config.listing_marker) {
                    Recovery::RebuildIndex => {
                        tracing::info!("stale handles suspected; re-scanning the table");
                        rows = rebuild_index(driver.as_ref()).await;
                    }
                    Recovery::GoBackAndRebuild => {
                        tracing::info!("navigated away; going back");
                        go_back(driver.as_ref(), config.nav_settle).await;
                        rows = rebuild_index(driver.as_ref()).await;
                    }
                    Recovery::AwaitRelogin => {
                        tracing::warn!("redirected to login; will re-authenticate on next check");
                        rows = rebuild_index(driver.as_ref()).await;
                    }
                    Recovery::None => {}
                }
            }
        }
    }
}

async fn prepare_period(
    driver: &Arc<dyn UiDriver>,
    periods: &PeriodSelector,
    period: &str,
) -> Result<RowIndex, DriverError> {
    periods.select_label(period).await?;
    scan::index_rows(driver.as_ref()).await
}

/// Re-checks the freshly resolved row and fetches its file. The row handle
/// comes from the current index, so a stale error here means the view
/// changed since the index was built.
async fn fetch_row(
    row: &dyn UiElement,
    target: &DownloadTarget,
    fetcher: &Fetcher,
) -> Result<RowOutcome, RowError> {
    let cells = row.find_all(Locator::Tag("td")).await?;
    let status_cell = cells.get(COL_STATUS).ok_or_else(|| {
        DriverError::new(DriverErrorKind::NotFound, "status column missing from row")
    })?;

    let status = status_cell.text().await?;
    if !status.to_lowercase().contains(SUBMITTED_MARKER) {
        return Ok(RowOutcome::NoLongerSubmitted);
    }

    let anchors = status_cell.find_all(Locator::Tag("a")).await?;
    let link = anchors.first().ok_or_else(|| {
        DriverError::new(DriverErrorKind::NotFound, "download link missing from status cell")
    })?;
    let url = link.attribute("href").await?.ok_or_else(|| {
        DriverError::new(DriverErrorKind::NotFound, "download link has no href")
    })?;

    let extension = paths::extension_from_url(&url);
    let dest = target.dir.join(format!("{}{extension}", target.file_prefix));
    fetcher.fetch(&url, &dest).await?;
    Ok(RowOutcome::Downloaded(dest))
}

async fn current_url(driver: &dyn UiDriver) -> String {
    driver.current_url().await.unwrap_or_default()
}

async fn go_back(driver: &dyn UiDriver, nav_settle: Duration) {
    if let Err(err) = driver.back().await {
        tracing::warn!(error = %err, "go-back failed");
    }
    tokio::time::sleep(nav_settle).await;
}

/// Best-effort rebuild. An empty index on failure is deliberate: remaining
/// records then resolve as row misses and are recorded, not lost.
async fn rebuild_index(driver: &dyn UiDriver) -> RowIndex {
    tracing::info!("re-scanning table rows to refresh handles");
    match scan::index_rows(driver).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(error = %err, "row re-scan failed; continuing with an empty index");
            RowIndex::new()
        }
    }
}

fn failure(record: &CandidateRecord, reason: impl Into<String>) -> FailureRecord {
    FailureRecord::new(
        &record.period,
        &record.course,
        paths::student_display(&record.first_name, &record.last_name),
        reason,
    )
}
