//! The boundary between the engine and whatever drives the browser.
//!
//! The engine only ever navigates, locates, reads, clicks, scrolls and waits.
//! Everything else about the browser process belongs to the implementation.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css `{}`", selector),
            Locator::XPath(expression) => write!(f, "xpath `{}`", expression),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),
    #[error("no element matches {0}")]
    NotFound(String),
    #[error("driver error: {0}")]
    Driver(String),
}

pub trait Browser {
    /// Opaque handle to an element on the current page.
    type Element: Clone;

    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    fn find_all(&mut self, locator: &Locator) -> Result<Vec<Self::Element>, DriverError>;

    fn text(&mut self, element: &Self::Element) -> Result<String, DriverError>;

    fn attr(&mut self, element: &Self::Element, name: &str) -> Result<Option<String>, DriverError>;

    fn click(&mut self, element: &Self::Element) -> Result<(), DriverError>;

    /// Scroll the first element matching `container` to its bottom.
    fn scroll(&mut self, container: &Locator) -> Result<(), DriverError>;

    fn current_url(&mut self) -> Result<String, DriverError>;

    /// Release the browser. Called once, at the end of a run.
    fn quit(self) -> Result<(), DriverError>
    where
        Self: Sized;

    /// Poll until `locator` matches at least one element or `timeout` runs out.
    ///
    /// Checks at least once, so a zero timeout is a single probe. Driver errors
    /// while polling count as "not there yet".
    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(found) = self.find_all(locator) {
                if !found.is_empty() {
                    return true;
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
        }
    }

    fn is_present(&mut self, locator: &Locator) -> bool {
        self.find_all(locator)
            .map(|found| !found.is_empty())
            .unwrap_or(false)
    }
}

/// Read-only view of the page used by field strategies.
///
/// Object safe, so strategies can be boxed regardless of the browser type.
pub trait PageReader {
    fn first_text(&mut self, locator: &Locator) -> Result<Option<String>, DriverError>;

    fn first_attr(&mut self, locator: &Locator, name: &str) -> Result<Option<String>, DriverError>;

    fn page_url(&mut self) -> Result<String, DriverError>;
}

impl<B: Browser> PageReader for B {
    fn first_text(&mut self, locator: &Locator) -> Result<Option<String>, DriverError> {
        match self.find_all(locator)?.first() {
            Some(element) => self.text(element).map(Some),
            None => Ok(None),
        }
    }

    fn first_attr(&mut self, locator: &Locator, name: &str) -> Result<Option<String>, DriverError> {
        match self.find_all(locator)?.first() {
            Some(element) => self.attr(element, name),
            None => Ok(None),
        }
    }

    fn page_url(&mut self) -> Result<String, DriverError> {
        self.current_url()
    }
}
