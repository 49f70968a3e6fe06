use std::sync::Arc;
use std::time::Duration;

use crate::driver::{DriverError, DriverErrorKind, Locator, UiDriver};

const USERNAME_FIELD: Locator = Locator::Name("username");
const PASSWORD_FIELD: Locator = Locator::Name("password");
const SUBMIT_LABEL: Locator = Locator::ButtonLabel("Log In");

/// Opaque portal credentials, passed through into the login form untouched.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// URL predicates for the two location-based recovery triggers. These are
/// the only places the run inspects URLs for meaning, so a portal URL-scheme
/// change is a one-module fix.
pub fn is_login_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains("login")
}

pub fn is_listing_url(url: &str, marker: &str) -> bool {
    url.to_ascii_lowercase().contains(&marker.to_ascii_lowercase())
}

/// Detects a silently expired session and restores it: refill the login
/// form, submit, and navigate back to the form listing. Called at every
/// period boundary; a failed attempt is logged and swallowed so the next
/// checkpoint can try again.
pub struct SessionGuard {
    driver: Arc<dyn UiDriver>,
    credentials: Credentials,
    listing_url: String,
    nav_settle: Duration,
}

impl SessionGuard {
    pub fn new(
        driver: Arc<dyn UiDriver>,
        credentials: Credentials,
        listing_url: impl Into<String>,
        nav_settle: Duration,
    ) -> Self {
        Self {
            driver,
            credentials,
            listing_url: listing_url.into(),
            nav_settle,
        }
    }

    /// No-op when already logged in. Never fails: session recovery is
    /// best-effort and retried at the next natural checkpoint.
    pub async fn ensure_logged_in(&self) {
        if let Err(err) = self.restore_if_expired().await {
            tracing::warn!(error = %err, "session check failed");
        }
    }

    async fn restore_if_expired(&self) -> Result<(), DriverError> {
        let fields = self.driver.find_all(USERNAME_FIELD).await?;
        if fields.is_empty() {
            return Ok(());
        }

        tracing::warn!("session expired; logging in again");
        self.submit_credentials().await?;
        self.recover_to_listing().await;
        Ok(())
    }

    /// Fills and submits the login form: labeled submit control first,
    /// Enter in the password field when the control is missing or refuses
    /// the click.
    pub async fn submit_credentials(&self) -> Result<(), DriverError> {
        let username = self.require(USERNAME_FIELD).await?;
        username.send_keys(&self.credentials.username).await?;

        let password = self.require(PASSWORD_FIELD).await?;
        password.send_keys(&self.credentials.password).await?;

        let submitted = match self.driver.find_all(SUBMIT_LABEL).await?.first() {
            Some(button) => button.click().await.is_ok(),
            None => false,
        };
        if !submitted {
            password.press_enter().await?;
        }

        tokio::time::sleep(self.nav_settle).await;
        Ok(())
    }

    /// Forced navigation back to the working listing view. Swallows errors:
    /// this is itself the recovery path of last resort.
    pub async fn recover_to_listing(&self) {
        tracing::info!(url = %self.listing_url, "navigating to form listing");
        if let Err(err) = self.driver.navigate(&self.listing_url).await {
            tracing::warn!(error = %err, "could not reach the form listing");
        }
        tokio::time::sleep(self.nav_settle).await;
    }

    async fn require(
        &self,
        locator: Locator,
    ) -> Result<Box<dyn crate::driver::UiElement>, DriverError> {
        self.driver
            .find_all(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::NotFound, format!("missing {locator:?}"))
            })
    }
}
