use anyhow::Context as _;
use async_trait::async_trait;
use thirtyfour::components::SelectElement;
use thirtyfour::error::{WebDriverError, WebDriverErrorInner};
use thirtyfour::{By, DesiredCapabilities, WebDriver, WebElement};

use crate::driver::{DriverError, DriverErrorKind, Locator, UiDriver, UiElement};

// WebDriver key code for Enter.
const ENTER: &str = "\u{e007}";

/// Production implementation of the driver seam on top of a remote
/// WebDriver session. This is the only module that touches `thirtyfour`
/// types, including the error-text fallback classification.
#[derive(Clone)]
pub struct WebDriverUi {
    driver: WebDriver,
}

impl WebDriverUi {
    pub async fn connect(server_url: &str) -> anyhow::Result<Self> {
        let caps = DesiredCapabilities::chrome();
        let driver = WebDriver::new(server_url, caps)
            .await
            .with_context(|| format!("connect to webdriver at {server_url}"))?;
        Ok(Self { driver })
    }

    pub async fn quit(self) -> anyhow::Result<()> {
        self.driver.quit().await.context("quit webdriver session")?;
        Ok(())
    }
}

fn by(locator: Locator) -> By {
    match locator {
        Locator::Id(id) => By::Id(id),
        Locator::Name(name) => By::Name(name),
        Locator::Tag(tag) => By::Tag(tag),
        Locator::ButtonLabel(label) => {
            By::XPath(format!("//button[contains(text(), '{label}')]"))
        }
    }
}

fn convert(err: WebDriverError) -> DriverError {
    let kind = match err.as_inner() {
        WebDriverErrorInner::NoSuchElement(_) => DriverErrorKind::NotFound,
        WebDriverErrorInner::StaleElementReference(_) => DriverErrorKind::Stale,
        WebDriverErrorInner::Timeout(_) => DriverErrorKind::Timeout,
        other => {
            // Some drivers surface staleness only in message text; this is
            // the single allowed text-matching fallback.
            let text = other.to_string().to_ascii_lowercase();
            if text.contains("stale element") {
                DriverErrorKind::Stale
            } else if text.contains("no such element") {
                DriverErrorKind::NotFound
            } else {
                DriverErrorKind::Other
            }
        }
    };
    DriverError::new(kind, err.to_string())
}

fn wrap_all(elements: Vec<WebElement>) -> Vec<Box<dyn UiElement>> {
    elements
        .into_iter()
        .map(|element| Box::new(WebDriverElement { element }) as Box<dyn UiElement>)
        .collect()
}

#[async_trait]
impl UiDriver for WebDriverUi {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.driver.goto(url).await.map_err(convert)
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.driver.current_url().await.map_err(convert)?.to_string())
    }

    async fn back(&self) -> Result<(), DriverError> {
        self.driver.back().await.map_err(convert)
    }

    async fn find_all(&self, locator: Locator) -> Result<Vec<Box<dyn UiElement>>, DriverError> {
        let found = self.driver.find_all(by(locator)).await.map_err(convert)?;
        Ok(wrap_all(found))
    }
}

struct WebDriverElement {
    element: WebElement,
}

impl WebDriverElement {
    async fn as_select(&self) -> Result<SelectElement, DriverError> {
        SelectElement::new(&self.element).await.map_err(convert)
    }
}

#[async_trait]
impl UiElement for WebDriverElement {
    async fn text(&self) -> Result<String, DriverError> {
        self.element.text().await.map_err(convert)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.element.attr(name).await.map_err(convert)
    }

    async fn click(&self) -> Result<(), DriverError> {
        self.element.click().await.map_err(convert)
    }

    async fn send_keys(&self, text: &str) -> Result<(), DriverError> {
        self.element.send_keys(text).await.map_err(convert)
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        self.element.send_keys(ENTER).await.map_err(convert)
    }

    async fn find_all(&self, locator: Locator) -> Result<Vec<Box<dyn UiElement>>, DriverError> {
        let found = self.element.find_all(by(locator)).await.map_err(convert)?;
        Ok(wrap_all(found))
    }

    async fn option_labels(&self) -> Result<Vec<String>, DriverError> {
        let select = self.as_select().await?;
        let options = select.options().await.map_err(convert)?;

        let mut labels = Vec::with_capacity(options.len());
        for option in options {
            labels.push(option.text().await.map_err(convert)?);
        }
        Ok(labels)
    }

    async fn select_by_index(&self, index: usize) -> Result<(), DriverError> {
        let select = self.as_select().await?;
        select
            .select_by_index(index as u32)
            .await
            .map_err(convert)
    }

    async fn select_by_label(&self, label: &str) -> Result<(), DriverError> {
        let select = self.as_select().await?;
        select.select_by_visible_text(label).await.map_err(convert)
    }
}
