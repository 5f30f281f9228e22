use crate::browser::{Browser, DriverError};
use crate::models::SearchTarget;
use crate::recipe::SiteRecipe;
use log::debug;
use std::time::Duration;
use thiserror::Error;

pub enum SearchOutcome<E> {
    Results(Vec<E>),
    Empty,
}

impl<E> SearchOutcome<E> {
    pub fn has_results(&self) -> bool {
        matches!(self, SearchOutcome::Results(_))
    }
}

/// Every variant means "skip this target"; none of them ends the run.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("navigation failed: {0}")]
    Navigation(#[source] DriverError),
    #[error("results did not render within {0:?}")]
    Timeout(Duration),
    #[error("could not read results: {0}")]
    Driver(#[source] DriverError),
}

/// Run one search and wait (bounded) for the site to answer it.
pub fn search<B: Browser>(
    browser: &mut B,
    recipe: &SiteRecipe,
    target: &SearchTarget,
    timeout: Duration,
) -> Result<SearchOutcome<B::Element>, SearchError> {
    let url = recipe.search_url(&target.query());
    debug!("Searching {}: {}", target, url);

    browser.navigate(&url).map_err(SearchError::Navigation)?;

    if !browser.wait_for(&recipe.results_ready, timeout) {
        if browser.is_present(&recipe.no_results) {
            return Ok(SearchOutcome::Empty);
        }
        return Err(SearchError::Timeout(timeout));
    }

    let handles = browser.find_all(&recipe.listing).map_err(SearchError::Driver)?;
    if handles.is_empty() {
        Ok(SearchOutcome::Empty)
    } else {
        Ok(SearchOutcome::Results(handles))
    }
}
