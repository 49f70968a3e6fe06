use std::sync::Arc;

use anyhow::Context as _;

use crate::driver::{DriverError, UiDriver};
use crate::periods::{PLACEHOLDER_MARKER, PeriodSelector};
use crate::records::WorkList;
use crate::scan;
use crate::session::SessionGuard;

enum ScanStep {
    Done,
    Placeholder,
    OutOfRange,
}

/// Walks every semester in dropdown order and folds qualifying rows into one
/// deduplicated work list. Any per-semester failure is logged, answered with
/// a forced navigation back to the listing, and the walk continues; only a
/// missing dropdown at the very start is fatal.
pub async fn discover_all(
    driver: &Arc<dyn UiDriver>,
    guard: &SessionGuard,
    periods: &PeriodSelector,
) -> anyhow::Result<WorkList> {
    let count = periods
        .labels()
        .await
        .context("locate the semester dropdown")?
        .len();
    tracing::info!(count, "found semesters");

    let mut work = WorkList::new();
    for index in 0..count {
        match scan_one(driver, guard, periods, index, count, &mut work).await {
            Ok(ScanStep::Done | ScanStep::Placeholder) => {}
            Ok(ScanStep::OutOfRange) => break,
            Err(err) => {
                tracing::warn!(index, error = %err, "semester scan failed; recovering");
                guard.recover_to_listing().await;
            }
        }
    }

    tracing::info!(total = work.len(), "discovery complete");
    Ok(work)
}

async fn scan_one(
    driver: &Arc<dyn UiDriver>,
    guard: &SessionGuard,
    periods: &PeriodSelector,
    index: usize,
    count: usize,
    work: &mut WorkList,
) -> Result<ScanStep, DriverError> {
    guard.ensure_logged_in().await;

    // Re-fetch labels on every pass: recovery may have re-rendered the
    // dropdown with fewer options than the initial count.
    let labels = periods.labels().await?;
    let Some(label) = labels.get(index) else {
        return Ok(ScanStep::OutOfRange);
    };
    if label.contains(PLACEHOLDER_MARKER) {
        return Ok(ScanStep::Placeholder);
    }

    tracing::info!(
        position = index + 1,
        total = count,
        semester = %label,
        "scanning semester"
    );
    periods.select_index(index).await?;

    let found = scan::scan_current_period(driver.as_ref(), label).await?;
    if !found.is_empty() {
        tracing::info!(count = found.len(), semester = %label, "found submitted forms");
    }
    for record in found {
        work.upsert(record);
    }
    Ok(ScanStep::Done)
}
