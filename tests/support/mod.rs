//! In-memory portal standing in for the real site behind the driver seam.
//!
//! Models just enough of the listing app for the orchestrator: a login form
//! shown whenever the session is logged out, a semester dropdown, and one
//! table of rows per semester. Fault knobs let tests inject select failures
//! and stale status-cell reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use formharvest::driver::{DriverError, DriverErrorKind, Locator, UiDriver, UiElement};

pub const LOGIN_URL: &str = "https://portal.test/department/login/";
pub const LISTING_URL: &str = "https://portal.test/department/tools/forms";
pub const DASHBOARD_URL: &str = "https://portal.test/department/home";
pub const USERNAME: &str = "dept-admin";
pub const PASSWORD: &str = "hunter2";

#[derive(Debug, Clone)]
pub struct FakeRow {
    pub cells: Vec<String>,
    pub header: bool,
    pub link: Option<String>,
}

pub fn form_row(
    course: &str,
    last_name: &str,
    first_name: &str,
    status: &str,
    link: Option<&str>,
) -> FakeRow {
    FakeRow {
        cells: [course, last_name, first_name, "3", "Paid", "5/1", status]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        header: false,
        link: link.map(str::to_owned),
    }
}

pub fn header_row() -> FakeRow {
    FakeRow {
        cells: Vec::new(),
        header: true,
        link: None,
    }
}

pub fn short_row(text: &str) -> FakeRow {
    FakeRow {
        cells: vec![text.to_owned(), "spans the page".to_owned()],
        header: false,
        link: None,
    }
}

#[derive(Debug, Default)]
pub struct PortalState {
    pub current_url: String,
    pub history: Vec<String>,
    pub logged_in: bool,
    pub typed_username: String,
    pub typed_password: String,
    pub periods: Vec<String>,
    pub selected: Option<usize>,
    pub selected_history: Vec<usize>,
    pub rows: HashMap<String, Vec<FakeRow>>,
    /// Hide the semester dropdown entirely (structural-failure tests).
    pub selector_missing: bool,
    /// Fail the next N selection attempts.
    pub fail_selects: u32,
    /// Fail the next N status-cell reads with a stale-handle error.
    pub stale_status_reads: u32,
}

pub struct FakePortal {
    state: Arc<Mutex<PortalState>>,
}

impl FakePortal {
    /// Portal sitting on its login page, session logged out.
    pub fn logged_out(periods: &[&str], rows: HashMap<String, Vec<FakeRow>>) -> Self {
        Self::build(periods, rows, false, LOGIN_URL)
    }

    /// Portal already authenticated and parked on the listing view.
    pub fn logged_in(periods: &[&str], rows: HashMap<String, Vec<FakeRow>>) -> Self {
        Self::build(periods, rows, true, LISTING_URL)
    }

    fn build(
        periods: &[&str],
        rows: HashMap<String, Vec<FakeRow>>,
        logged_in: bool,
        url: &str,
    ) -> Self {
        let state = PortalState {
            current_url: url.to_owned(),
            logged_in,
            periods: periods.iter().map(|p| (*p).to_owned()).collect(),
            rows,
            ..PortalState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap()
    }

    pub fn driver(&self) -> Arc<dyn UiDriver> {
        Arc::new(FakeUi {
            state: self.state.clone(),
        })
    }
}

fn stale() -> DriverError {
    DriverError::new(
        DriverErrorKind::Stale,
        "stale element reference: element is not attached to the page document",
    )
}

fn not_a_select() -> DriverError {
    DriverError::new(DriverErrorKind::Other, "element is not a select control")
}

#[derive(Clone)]
enum Node {
    UsernameField,
    PasswordField,
    LoginButton,
    PeriodSelect,
    Table(String),
    Row { period: String, index: usize },
    Cell { period: String, row: usize, col: usize },
    HeaderCell,
    Anchor { href: String },
}

struct FakeUi {
    state: Arc<Mutex<PortalState>>,
}

struct FakeElement {
    state: Arc<Mutex<PortalState>>,
    node: Node,
}

impl FakeUi {
    fn element(&self, node: Node) -> Box<dyn UiElement> {
        Box::new(FakeElement {
            state: self.state.clone(),
            node,
        })
    }
}

#[async_trait]
impl UiDriver for FakeUi {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        let previous = std::mem::replace(&mut state.current_url, url.to_owned());
        state.history.push(previous);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().current_url.clone())
    }

    async fn back(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.history.pop() {
            state.current_url = previous;
        }
        Ok(())
    }

    async fn find_all(&self, locator: Locator) -> Result<Vec<Box<dyn UiElement>>, DriverError> {
        let state = self.state.lock().unwrap();

        // A logged-out session renders the login form wherever it goes.
        if !state.logged_in {
            drop(state);
            return Ok(match locator {
                Locator::Name("username") => vec![self.element(Node::UsernameField)],
                Locator::Name("password") => vec![self.element(Node::PasswordField)],
                Locator::ButtonLabel("Log In") => vec![self.element(Node::LoginButton)],
                _ => Vec::new(),
            });
        }

        match locator {
            Locator::Id("select-semester")
                if !state.selector_missing && state.current_url == LISTING_URL =>
            {
                drop(state);
                Ok(vec![self.element(Node::PeriodSelect)])
            }
            Locator::Tag("table") if state.current_url == LISTING_URL => {
                let period = state
                    .selected
                    .and_then(|index| state.periods.get(index).cloned())
                    .filter(|label| state.rows.contains_key(label));
                drop(state);
                Ok(period
                    .map(|label| vec![self.element(Node::Table(label))])
                    .unwrap_or_default())
            }
            _ => Ok(Vec::new()),
        }
    }
}

impl FakeElement {
    fn child(&self, node: Node) -> Box<dyn UiElement> {
        Box::new(FakeElement {
            state: self.state.clone(),
            node,
        })
    }

    fn submit_login(&self, state: &mut PortalState) {
        if state.typed_username == USERNAME && state.typed_password == PASSWORD {
            state.logged_in = true;
            let previous = std::mem::replace(&mut state.current_url, DASHBOARD_URL.to_owned());
            state.history.push(previous);
        }
    }
}

#[async_trait]
impl UiElement for FakeElement {
    async fn text(&self) -> Result<String, DriverError> {
        let mut state = self.state.lock().unwrap();
        match &self.node {
            Node::Cell { period, row, col } => {
                if *col == 6 && state.stale_status_reads > 0 {
                    state.stale_status_reads -= 1;
                    return Err(stale());
                }
                let text = state
                    .rows
                    .get(period)
                    .and_then(|rows| rows.get(*row))
                    .and_then(|row| row.cells.get(*col))
                    .cloned();
                text.ok_or_else(stale)
            }
            Node::Anchor { .. } => Ok("View Form".to_owned()),
            Node::HeaderCell => Ok("Course".to_owned()),
            _ => Ok(String::new()),
        }
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        match &self.node {
            Node::Anchor { href } if name == "href" => Ok(Some(href.clone())),
            _ => Ok(None),
        }
    }

    async fn click(&self) -> Result<(), DriverError> {
        if let Node::LoginButton = self.node {
            let mut state = self.state.lock().unwrap();
            self.submit_login(&mut state);
        }
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        match self.node {
            Node::UsernameField => state.typed_username.push_str(text),
            Node::PasswordField => state.typed_password.push_str(text),
            _ => {}
        }
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        if let Node::PasswordField = self.node {
            let mut state = self.state.lock().unwrap();
            self.submit_login(&mut state);
        }
        Ok(())
    }

    async fn find_all(&self, locator: Locator) -> Result<Vec<Box<dyn UiElement>>, DriverError> {
        let state = self.state.lock().unwrap();
        match (&self.node, locator) {
            (Node::Table(period), Locator::Tag("tr")) => {
                let count = state.rows.get(period).map(Vec::len).unwrap_or(0);
                let period = period.clone();
                drop(state);
                Ok((0..count)
                    .map(|index| {
                        self.child(Node::Row {
                            period: period.clone(),
                            index,
                        })
                    })
                    .collect())
            }
            (Node::Row { period, index }, Locator::Tag("th")) => {
                let header = state
                    .rows
                    .get(period)
                    .and_then(|rows| rows.get(*index))
                    .is_some_and(|row| row.header);
                drop(state);
                Ok(if header {
                    vec![self.child(Node::HeaderCell)]
                } else {
                    Vec::new()
                })
            }
            (Node::Row { period, index }, Locator::Tag("td")) => {
                let cells = state
                    .rows
                    .get(period)
                    .and_then(|rows| rows.get(*index))
                    .map(|row| if row.header { 0 } else { row.cells.len() })
                    .unwrap_or(0);
                let (period, row) = (period.clone(), *index);
                drop(state);
                Ok((0..cells)
                    .map(|col| {
                        self.child(Node::Cell {
                            period: period.clone(),
                            row,
                            col,
                        })
                    })
                    .collect())
            }
            (Node::Cell { period, row, col }, Locator::Tag("a")) if *col == 6 => {
                let href = state
                    .rows
                    .get(period)
                    .and_then(|rows| rows.get(*row))
                    .and_then(|row| row.link.clone());
                drop(state);
                Ok(href
                    .map(|href| vec![self.child(Node::Anchor { href })])
                    .unwrap_or_default())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn option_labels(&self) -> Result<Vec<String>, DriverError> {
        match self.node {
            Node::PeriodSelect => Ok(self.state.lock().unwrap().periods.clone()),
            _ => Err(not_a_select()),
        }
    }

    async fn select_by_index(&self, index: usize) -> Result<(), DriverError> {
        let Node::PeriodSelect = self.node else {
            return Err(not_a_select());
        };
        let mut state = self.state.lock().unwrap();
        if state.fail_selects > 0 {
            state.fail_selects -= 1;
            return Err(DriverError::new(
                DriverErrorKind::Other,
                "selection rejected by the page",
            ));
        }
        if index >= state.periods.len() {
            return Err(DriverError::new(
                DriverErrorKind::NotFound,
                format!("no option at index {index}"),
            ));
        }
        state.selected = Some(index);
        state.selected_history.push(index);
        Ok(())
    }

    async fn select_by_label(&self, label: &str) -> Result<(), DriverError> {
        let index = {
            let state = self.state.lock().unwrap();
            state.periods.iter().position(|period| period == label)
        };
        match index {
            Some(index) => self.select_by_index(index).await,
            None => Err(DriverError::new(
                DriverErrorKind::NotFound,
                format!("no option labeled {label:?}"),
            )),
        }
    }
}
