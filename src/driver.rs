use async_trait::async_trait;
use thiserror::Error;

/// Recovery-relevant classification of a driver failure.
///
/// The orchestrator dispatches recovery on these tags instead of inspecting
/// error text; adapters are responsible for mapping their client's errors
/// into this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The requested element does not exist in the current view.
    NotFound,
    /// A previously obtained handle no longer matches live content.
    Stale,
    /// The driver gave up waiting on the browser.
    Timeout,
    /// Anything the adapter could not classify.
    Other,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    kind: DriverErrorKind,
    message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }
}

/// How the orchestrator asks for elements. Deliberately narrow: the portal is
/// only ever addressed by tag, form-field name, control id, or the visible
/// label of a submit button.
#[derive(Debug, Clone, Copy)]
pub enum Locator {
    Id(&'static str),
    Name(&'static str),
    Tag(&'static str),
    ButtonLabel(&'static str),
}

/// A live browser session. One instance is created per run and owned by the
/// composition root; every component receives it as a shared capability so
/// tests can substitute an in-memory portal.
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn back(&self) -> Result<(), DriverError>;

    /// Zero-or-more matches; a missing element is an empty vec, not an error.
    async fn find_all(&self, locator: Locator) -> Result<Vec<Box<dyn UiElement>>, DriverError>;
}

/// A handle to a rendered element. Handles are snapshots: after any
/// navigation or re-render they may go stale, and every call can fail with
/// [`DriverErrorKind::Stale`].
#[async_trait]
pub trait UiElement: Send + Sync {
    async fn text(&self) -> Result<String, DriverError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;

    async fn click(&self) -> Result<(), DriverError>;

    async fn send_keys(&self, text: &str) -> Result<(), DriverError>;

    async fn press_enter(&self) -> Result<(), DriverError>;

    async fn find_all(&self, locator: Locator) -> Result<Vec<Box<dyn UiElement>>, DriverError>;

    /// Visible labels of a dropdown's options, in dropdown order.
    /// Errors unless the element is a select-like control.
    async fn option_labels(&self) -> Result<Vec<String>, DriverError>;

    async fn select_by_index(&self, index: usize) -> Result<(), DriverError>;

    async fn select_by_label(&self, label: &str) -> Result<(), DriverError>;
}
