use std::sync::Arc;
use std::time::Duration;

use crate::driver::{DriverError, DriverErrorKind, Locator, UiDriver, UiElement};

pub const PERIOD_SELECT: Locator = Locator::Id("select-semester");

/// Label marking the "no semester chosen" sentinel option.
pub const PLACEHOLDER_MARKER: &str = "Select";

/// Enumerates and drives the semester dropdown.
///
/// The control is re-located on every call, never cached: session recovery
/// navigates the page out from under any held handle, and a selection
/// re-renders the control itself.
pub struct PeriodSelector {
    driver: Arc<dyn UiDriver>,
    settle: Duration,
}

impl PeriodSelector {
    pub fn new(driver: Arc<dyn UiDriver>, settle: Duration) -> Self {
        Self { driver, settle }
    }

    async fn control(&self) -> Result<Box<dyn UiElement>, DriverError> {
        self.driver
            .find_all(PERIOD_SELECT)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::NotFound, "semester dropdown not present")
            })
    }

    /// Trimmed option labels in dropdown order, placeholder included.
    pub async fn labels(&self) -> Result<Vec<String>, DriverError> {
        let labels = self.control().await?.option_labels().await?;
        Ok(labels.into_iter().map(|label| label.trim().to_owned()).collect())
    }

    pub async fn select_index(&self, index: usize) -> Result<(), DriverError> {
        self.control().await?.select_by_index(index).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    pub async fn select_label(&self, label: &str) -> Result<(), DriverError> {
        self.control().await?.select_by_label(label).await?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }
}
