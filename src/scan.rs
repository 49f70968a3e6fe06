use std::collections::HashMap;

use crate::driver::{DriverError, Locator, UiDriver, UiElement};
use crate::records::{CandidateRecord, RowKey, normalize_name};

// Listing row schema, by cell position:
// [Course, Last Name, First Name, Hours, Payment, Due Date, Form Status]
pub const COL_COURSE: usize = 0;
pub const COL_LAST_NAME: usize = 1;
pub const COL_FIRST_NAME: usize = 2;
pub const COL_STATUS: usize = 6;

/// Rows with fewer cells are malformed or decorative and are skipped, never
/// indexed into.
pub const MIN_ROW_CELLS: usize = 7;

/// Case-insensitive substring a status cell must carry to qualify.
pub const SUBMITTED_MARKER: &str = "submitted";

const TABLE: Locator = Locator::Tag("table");
const ROW: Locator = Locator::Tag("tr");
const HEADER_CELL: Locator = Locator::Tag("th");
const CELL: Locator = Locator::Tag("td");
const ANCHOR: Locator = Locator::Tag("a");

/// Reads every rendered table in the current view and returns one candidate
/// per qualifying row: at least the full column count, a link in the status
/// cell, and status text containing "submitted". Pure read, no navigation.
pub async fn scan_current_period(
    driver: &dyn UiDriver,
    period: &str,
) -> Result<Vec<CandidateRecord>, DriverError> {
    let mut found = Vec::new();
    for table in driver.find_all(TABLE).await? {
        if let Err(err) = scan_table(table.as_ref(), period, &mut found).await {
            tracing::debug!(error = %err, "table scan failed; skipping table");
        }
    }
    Ok(found)
}

async fn scan_table(
    table: &dyn UiElement,
    period: &str,
    found: &mut Vec<CandidateRecord>,
) -> Result<(), DriverError> {
    let rows = table.find_all(ROW).await?;
    // Header-only tables render one row; nothing to collect.
    if rows.len() <= 1 {
        return Ok(());
    }

    for row in rows {
        if !row.find_all(HEADER_CELL).await?.is_empty() {
            continue;
        }

        let cells = row.find_all(CELL).await?;
        if cells.len() < MIN_ROW_CELLS {
            continue;
        }

        let course = cells[COL_COURSE].text().await?;
        let last_name = cells[COL_LAST_NAME].text().await?;
        let first_name = cells[COL_FIRST_NAME].text().await?;

        match qualifies(cells[COL_STATUS].as_ref()).await {
            Ok(true) => found.push(CandidateRecord::new(period, &course, &first_name, &last_name)),
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(error = %err, "status cell read failed; skipping row");
            }
        }
    }
    Ok(())
}

async fn qualifies(status_cell: &dyn UiElement) -> Result<bool, DriverError> {
    if status_cell.find_all(ANCHOR).await?.is_empty() {
        return Ok(false);
    }
    let status = status_cell.text().await?;
    Ok(status.to_lowercase().contains(SUBMITTED_MARKER))
}

/// Live row handles for the current period keyed by `(course, first, last)`,
/// unfiltered by status: the download pass re-checks status on the fresh
/// handle itself. Rebuilt from scratch after every recovery.
pub type RowIndex = HashMap<RowKey, Box<dyn UiElement>>;

pub async fn index_rows(driver: &dyn UiDriver) -> Result<RowIndex, DriverError> {
    let mut index = RowIndex::new();
    for table in driver.find_all(TABLE).await? {
        for row in table.find_all(ROW).await? {
            match key_for_row(row.as_ref()).await {
                Ok(Some(key)) => {
                    index.insert(key, row);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "row read failed; leaving it out of the index");
                }
            }
        }
    }
    Ok(index)
}

async fn key_for_row(row: &dyn UiElement) -> Result<Option<RowKey>, DriverError> {
    let cells = row.find_all(CELL).await?;
    if cells.len() < MIN_ROW_CELLS {
        return Ok(None);
    }

    let course = cells[COL_COURSE].text().await?.trim().to_owned();
    let last_name = normalize_name(&cells[COL_LAST_NAME].text().await?);
    let first_name = normalize_name(&cells[COL_FIRST_NAME].text().await?);
    Ok(Some((course, first_name, last_name)))
}
