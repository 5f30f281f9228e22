use crate::browser::{Browser, DriverError, Locator, PageReader};
use crate::models::{ListingRecord, SearchTarget};
use crate::parser;
use crate::recipe::SiteRecipe;
use log::debug;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

const PANEL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What the result list itself says about one listing, read before opening it.
#[derive(Debug, Clone, Default)]
pub struct ListingContext {
    pub label: Option<String>,
    pub link: Option<String>,
}

impl ListingContext {
    fn read<B: Browser>(browser: &mut B, handle: &B::Element, recipe: &SiteRecipe) -> Self {
        let label = browser
            .attr(handle, &recipe.listing_label_attr)
            .ok()
            .flatten()
            .and_then(|label| parser::non_empty(&label));
        let link = browser
            .attr(handle, "href")
            .ok()
            .flatten()
            .and_then(|link| parser::non_empty(&link));
        Self { label, link }
    }

    /// Short name used in log lines.
    pub fn describe(&self) -> &str {
        self.label.as_deref().unwrap_or("<unlabelled listing>")
    }
}

/// One way of reading one field.
pub trait FieldStrategy {
    fn read(
        &self,
        listing: &ListingContext,
        page: &mut dyn PageReader,
    ) -> Result<Option<String>, DriverError>;
}

/// The listing's accessible label in the result list.
pub struct ListingLabel;

impl FieldStrategy for ListingLabel {
    fn read(&self, listing: &ListingContext, _page: &mut dyn PageReader) -> Result<Option<String>, DriverError> {
        Ok(listing.label.clone())
    }
}

/// The listing's link in the result list.
pub struct ListingLink;

impl FieldStrategy for ListingLink {
    fn read(&self, listing: &ListingContext, _page: &mut dyn PageReader) -> Result<Option<String>, DriverError> {
        Ok(listing.link.clone())
    }
}

pub struct TextOf(pub Locator);

impl FieldStrategy for TextOf {
    fn read(&self, _listing: &ListingContext, page: &mut dyn PageReader) -> Result<Option<String>, DriverError> {
        page.first_text(&self.0)
    }
}

pub struct AttrOf(pub Locator, pub String);

impl FieldStrategy for AttrOf {
    fn read(&self, _listing: &ListingContext, page: &mut dyn PageReader) -> Result<Option<String>, DriverError> {
        page.first_attr(&self.0, &self.1)
    }
}

/// The URL of the page currently shown.
pub struct PageUrl;

impl FieldStrategy for PageUrl {
    fn read(&self, _listing: &ListingContext, page: &mut dyn PageReader) -> Result<Option<String>, DriverError> {
        page.page_url().map(Some)
    }
}

/// Tries each strategy in turn and keeps the first non-blank value.
pub struct FirstOf(pub Vec<Box<dyn FieldStrategy>>);

impl FieldStrategy for FirstOf {
    fn read(&self, listing: &ListingContext, page: &mut dyn PageReader) -> Result<Option<String>, DriverError> {
        let mut last_error = None;
        for strategy in &self.0 {
            match strategy.read(listing, page) {
                Ok(Some(value)) if !value.trim().is_empty() => return Ok(Some(value)),
                Ok(_) => {}
                Err(e) => last_error = Some(e),
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

/// Per-field strategies for a listing's detail view.
pub struct ExtractionRecipe {
    pub name: Box<dyn FieldStrategy>,
    pub address: Box<dyn FieldStrategy>,
    pub website: Box<dyn FieldStrategy>,
    pub phone: Box<dyn FieldStrategy>,
    pub review_count: Box<dyn FieldStrategy>,
    pub review_average: Box<dyn FieldStrategy>,
    pub coordinates: Box<dyn FieldStrategy>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListingSkip {
    OpenFailed { attempts: usize, last_error: String },
}

impl fmt::Display for ListingSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingSkip::OpenFailed { attempts, last_error } => {
                write!(f, "could not open after {} attempts ({})", attempts, last_error)
            }
        }
    }
}

pub struct ListingExtractor<'a> {
    recipe: &'a SiteRecipe,
    max_attempts: usize,
    backoff: Duration,
    detail_timeout: Duration,
}

impl<'a> ListingExtractor<'a> {
    pub fn new(recipe: &'a SiteRecipe, max_attempts: usize, backoff: Duration, detail_timeout: Duration) -> Self {
        Self {
            recipe,
            max_attempts,
            backoff,
            detail_timeout,
        }
    }

    /// Open one listing and read its fields.
    ///
    /// Missing or unreadable fields fall back to their defaults; only failing
    /// to open the listing at all skips it.
    pub fn extract<B: Browser>(
        &self,
        browser: &mut B,
        handle: &B::Element,
        target: &SearchTarget,
    ) -> Result<ListingRecord, ListingSkip> {
        let listing = ListingContext::read(browser, handle, self.recipe);
        self.open(browser, handle, &listing)?;

        let fields = &self.recipe.fields;
        let page: &mut dyn PageReader = browser;
        let mut record = ListingRecord::empty(target);

        if let Some(name) = read_field("name", fields.name.as_ref(), &listing, page) {
            record.name = name;
        }
        if let Some(address) = read_field("address", fields.address.as_ref(), &listing, page) {
            if let Some(address) = parser::non_empty(parser::strip_label(&address)) {
                record.address = address;
            }
        }
        if let Some(website) = read_field("website", fields.website.as_ref(), &listing, page) {
            record.website = website;
        }
        if let Some(phone) = read_field("phone", fields.phone.as_ref(), &listing, page) {
            if let Some(phone) = parser::non_empty(parser::strip_label(&phone)) {
                record.phone = phone;
            }
        }
        record.review_count = read_field("review count", fields.review_count.as_ref(), &listing, page)
            .and_then(|text| parser::parse_review_count(&text))
            .unwrap_or(0);
        record.review_average = read_field("review average", fields.review_average.as_ref(), &listing, page)
            .and_then(|text| parser::parse_review_average(&text))
            .unwrap_or(0.0);
        record.coordinates = read_field("coordinates", fields.coordinates.as_ref(), &listing, page)
            .and_then(|url| parser::parse_coordinates(&url));

        Ok(record)
    }

    fn open<B: Browser>(
        &self,
        browser: &mut B,
        handle: &B::Element,
        listing: &ListingContext,
    ) -> Result<(), ListingSkip> {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.max_attempts {
            match browser.click(handle) {
                Ok(()) if browser.wait_for(&self.recipe.detail_ready, self.detail_timeout) => {
                    if self.wait_for_panel(browser, listing) {
                        return Ok(());
                    }
                    last_error = "detail view still shows another listing".to_string();
                }
                Ok(()) => {
                    last_error = format!("detail view did not appear within {:?}", self.detail_timeout);
                }
                Err(e) => last_error = e.to_string(),
            }

            debug!(
                "Attempt {}/{} to open {} failed: {}",
                attempt,
                self.max_attempts,
                listing.describe(),
                last_error
            );
            if attempt < self.max_attempts && !self.backoff.is_zero() {
                thread::sleep(self.backoff);
            }
        }

        Err(ListingSkip::OpenFailed {
            attempts: self.max_attempts,
            last_error,
        })
    }

    /// Poll until the detail view belongs to `listing`, checking at least once.
    ///
    /// The previously opened listing's view can stay up for a moment after a click.
    fn wait_for_panel<B: Browser>(&self, browser: &mut B, listing: &ListingContext) -> bool {
        let deadline = Instant::now() + self.detail_timeout;
        loop {
            if self.shows(browser, listing) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(PANEL_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Whether the detail view shows `listing`.
    ///
    /// The heading is compared with the listing's label; without both, the
    /// coordinates in the page URL are compared with the listing's link. A
    /// listing with neither is taken as shown.
    fn shows<B: Browser>(&self, browser: &mut B, listing: &ListingContext) -> bool {
        let heading = browser
            .first_text(&self.recipe.detail_ready)
            .ok()
            .flatten()
            .and_then(|text| parser::non_empty(&text));
        if let (Some(label), Some(heading)) = (&listing.label, heading) {
            return *label == heading;
        }

        match listing.link.as_deref().and_then(parser::parse_coordinates) {
            Some(expected) => browser
                .current_url()
                .ok()
                .and_then(|url| parser::parse_coordinates(&url))
                .map_or(false, |shown| shown == expected),
            None => true,
        }
    }
}

fn read_field(
    field: &str,
    strategy: &dyn FieldStrategy,
    listing: &ListingContext,
    page: &mut dyn PageReader,
) -> Option<String> {
    match strategy.read(listing, page) {
        Ok(Some(value)) => parser::non_empty(&value),
        Ok(None) => None,
        Err(e) => {
            debug!("Field {} of {} defaulted: {}", field, listing.describe(), e);
            None
        }
    }
}
