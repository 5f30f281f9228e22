//! Scripted stand-ins for the browser and the output file.

use crate::browser::{Browser, DriverError, Locator};
use crate::extractor::{AttrOf, ExtractionRecipe, FirstOf, ListingLabel, ListingLink, PageUrl, TextOf};
use crate::models::ListingRecord;
use crate::recipe::SiteRecipe;
use crate::store::RecordSink;
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};

/// Recipe whose locators are plain names understood by [`FakeBrowser`].
pub fn test_recipe() -> SiteRecipe {
    SiteRecipe {
        home_url: "https://maps.test/".to_string(),
        search_url_prefix: "https://maps.test/search/".to_string(),
        results_ready: Locator::css("feed"),
        results_feed: Locator::css("feed"),
        listing: Locator::css("listing"),
        listing_label_attr: "aria-label".to_string(),
        end_of_list: Locator::css("end"),
        no_results: Locator::css("no-results"),
        detail_ready: Locator::css("detail"),
        fields: ExtractionRecipe {
            name: Box::new(FirstOf(vec![
                Box::new(TextOf(Locator::css("name"))),
                Box::new(ListingLabel),
            ])),
            address: Box::new(AttrOf(Locator::css("address"), "aria-label".to_string())),
            website: Box::new(AttrOf(Locator::css("website"), "href".to_string())),
            phone: Box::new(AttrOf(Locator::css("phone"), "aria-label".to_string())),
            review_count: Box::new(AttrOf(Locator::css("reviews"), "aria-label".to_string())),
            review_average: Box::new(TextOf(Locator::css("rating"))),
            coordinates: Box::new(FirstOf(vec![Box::new(ListingLink), Box::new(PageUrl)])),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeListing {
    pub label: Option<String>,
    pub heading: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub reviews: Option<String>,
    pub rating: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    /// Clicks on this listing fail this many times before one succeeds.
    pub failing_clicks: usize,
    /// After a click the previous detail view stays up for this many page reads.
    pub panel_lag: usize,
}

impl FakeListing {
    pub fn full(name: &str) -> Self {
        let slug = name.to_lowercase().replace(' ', "-");
        Self {
            label: Some(name.to_string()),
            heading: Some(name.to_string()),
            address: Some(format!("Address: 1 {} Way, Austin", name)),
            phone: Some("Phone: (512) 555-0100".to_string()),
            website: Some(format!("https://{}.example", slug)),
            reviews: Some("1,234 reviews".to_string()),
            rating: Some("4.6".to_string()),
            coordinates: Some((30.2672, -97.7431)),
            failing_clicks: 0,
            panel_lag: 0,
        }
    }

    pub fn bare(label: Option<&str>) -> Self {
        Self {
            label: label.map(str::to_string),
            ..Self::default()
        }
    }

    fn link(&self) -> Option<String> {
        self.coordinates
            .map(|(lat, lng)| format!("https://maps.test/place/x/data=!3d{}!4d{}", lat, lng))
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => self.heading.clone(),
            "address" => self.address.clone(),
            "phone" => self.phone.clone(),
            "website" => self.website.clone(),
            "reviews" => self.reviews.clone(),
            "rating" => self.rating.clone(),
            _ => None,
        }
    }
}

/// One search's result list.
#[derive(Debug, Clone)]
pub struct FakePage {
    listings: Vec<FakeListing>,
    initial: usize,
    batch: usize,
    load_every: usize,
    end_marker: bool,
    end_after_scrolls: usize,
    no_results: bool,
    renders: bool,
}

impl FakePage {
    /// Every listing loaded up front and the end-of-list marker shown.
    pub fn new(listings: Vec<FakeListing>) -> Self {
        Self {
            initial: listings.len(),
            listings,
            batch: 0,
            load_every: 1,
            end_marker: true,
            end_after_scrolls: 0,
            no_results: false,
            renders: true,
        }
    }

    /// Show `initial` listings, then `batch` more per loading scroll.
    pub fn paged(mut self, initial: usize, batch: usize) -> Self {
        self.initial = initial.min(self.listings.len());
        self.batch = batch;
        self
    }

    /// Only every `n`th scroll loads anything.
    pub fn loading_every(mut self, n: usize) -> Self {
        self.load_every = n.max(1);
        self
    }

    /// The end-of-list marker only shows from the `n`th scroll on.
    pub fn end_marker_after(mut self, n: usize) -> Self {
        self.end_after_scrolls = n;
        self
    }

    pub fn without_end_marker(mut self) -> Self {
        self.end_marker = false;
        self
    }

    /// The site's "can't find" answer.
    pub fn empty() -> Self {
        Self {
            renders: false,
            no_results: true,
            end_marker: false,
            ..Self::new(Vec::new())
        }
    }

    /// Neither a result list nor a "can't find" message ever appears.
    pub fn unresponsive() -> Self {
        Self {
            renders: false,
            end_marker: false,
            ..Self::new(Vec::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FakeElement {
    Feed,
    Listing(usize),
    Field(usize, String),
    Marker,
}

/// In-memory browser serving [`FakePage`]s for URLs that contain a needle.
#[derive(Default)]
pub struct FakeBrowser {
    pages: Vec<(String, FakePage)>,
    failing_locators: HashSet<String>,
    fail_navigation: bool,
    current: Option<usize>,
    url: String,
    loaded: usize,
    page_scrolls: usize,
    opened: Option<usize>,
    switching: Option<(usize, usize)>,
    click_attempts: HashMap<(usize, usize), usize>,
    clicks: usize,
    scrolls: usize,
    navigations: Vec<String>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` for any URL whose decoded form contains `needle`.
    pub fn with_page(mut self, needle: &str, page: FakePage) -> Self {
        self.pages.push((needle.to_string(), page));
        self
    }

    /// Every lookup of the css locator `name` errors.
    pub fn failing_locator(mut self, name: &str) -> Self {
        self.failing_locators.insert(name.to_string());
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn clicks(&self) -> usize {
        self.clicks
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls
    }

    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    fn page(&self) -> Option<&FakePage> {
        self.current.map(|index| &self.pages[index].1)
    }

    fn listing(&self, index: usize) -> Option<&FakeListing> {
        self.page().and_then(|page| page.listings.get(index))
    }

    fn show(&mut self, index: usize) {
        self.opened = Some(index);
        if let Some(link) = self.listing(index).and_then(|l| l.link()) {
            self.url = link;
        }
    }

    /// One page read while a lagging detail view catches up.
    fn tick(&mut self) {
        let switching = self.switching;
        match switching {
            Some((index, 0)) => {
                self.switching = None;
                self.show(index);
            }
            Some((index, left)) => self.switching = Some((index, left - 1)),
            None => {}
        }
    }
}

impl Browser for FakeBrowser {
    type Element = FakeElement;

    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        if self.fail_navigation {
            return Err(DriverError::Driver("connection refused".to_string()));
        }
        self.navigations.push(url.to_string());

        let decoded = urlencoding::decode(url)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| url.to_string());
        self.current = self
            .pages
            .iter()
            .position(|(needle, _)| decoded.contains(needle.as_str()));
        self.url = url.to_string();
        self.loaded = self.page().map(|page| page.initial).unwrap_or(0);
        self.page_scrolls = 0;
        self.opened = None;
        self.switching = None;
        Ok(())
    }

    fn find_all(&mut self, locator: &Locator) -> Result<Vec<FakeElement>, DriverError> {
        let name = match locator {
            Locator::Css(name) => name.as_str(),
            Locator::XPath(_) => return Ok(Vec::new()),
        };
        if self.failing_locators.contains(name) {
            return Err(DriverError::Driver(format!("stale element: {}", name)));
        }
        self.tick();
        let page = match self.page() {
            Some(page) => page,
            None => return Ok(Vec::new()),
        };

        let found = match name {
            "feed" if page.renders => vec![FakeElement::Feed],
            "listing" if page.renders => (0..self.loaded).map(FakeElement::Listing).collect(),
            "end" if page.end_marker
                && self.loaded >= page.listings.len()
                && self.page_scrolls >= page.end_after_scrolls =>
            {
                vec![FakeElement::Marker]
            }
            "no-results" if page.no_results => vec![FakeElement::Marker],
            "detail" => match self.opened {
                Some(index) => vec![FakeElement::Field(index, "name".to_string())],
                None => Vec::new(),
            },
            field => match self.opened {
                Some(index) if page.listings[index].field(field).is_some() => {
                    vec![FakeElement::Field(index, field.to_string())]
                }
                _ => Vec::new(),
            },
        };
        Ok(found)
    }

    fn text(&mut self, element: &FakeElement) -> Result<String, DriverError> {
        let text = match element {
            FakeElement::Listing(index) => self.listing(*index).and_then(|l| l.label.clone()),
            FakeElement::Field(index, field) => self.listing(*index).and_then(|l| l.field(field)),
            _ => None,
        };
        Ok(text.unwrap_or_default())
    }

    fn attr(&mut self, element: &FakeElement, name: &str) -> Result<Option<String>, DriverError> {
        let value = match element {
            FakeElement::Listing(index) => {
                let listing = self.listing(*index);
                match name {
                    "aria-label" => listing.and_then(|l| l.label.clone()),
                    "href" => listing.and_then(|l| l.link()),
                    _ => None,
                }
            }
            FakeElement::Field(index, field) => self.listing(*index).and_then(|l| l.field(field)),
            _ => None,
        };
        Ok(value)
    }

    fn click(&mut self, element: &FakeElement) -> Result<(), DriverError> {
        self.clicks += 1;
        let index = match element {
            FakeElement::Listing(index) => *index,
            _ => return Ok(()),
        };
        let failing = self.listing(index).map(|l| l.failing_clicks).unwrap_or(0);
        let page = self.current.unwrap_or(usize::MAX);

        let attempts = self.click_attempts.entry((page, index)).or_insert(0);
        *attempts += 1;
        if *attempts <= failing {
            return Err(DriverError::Driver("element click intercepted".to_string()));
        }
        let lag = self.listing(index).map(|l| l.panel_lag).unwrap_or(0);
        let switching = self.switching;
        match switching {
            Some((pending, _)) if pending == index => {}
            _ if lag == 0 || self.opened.is_none() || self.opened == Some(index) => self.show(index),
            _ => self.switching = Some((index, lag)),
        }
        Ok(())
    }

    fn scroll(&mut self, _container: &Locator) -> Result<(), DriverError> {
        self.scrolls += 1;
        self.page_scrolls += 1;
        let loads = self
            .page()
            .filter(|page| self.page_scrolls % page.load_every == 0)
            .map(|page| (page.batch, page.listings.len()));
        if let Some((batch, total)) = loads {
            self.loaded = (self.loaded + batch).min(total);
        }
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        self.tick();
        Ok(self.url.clone())
    }

    fn quit(self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Sink that keeps everything in memory and records batch sizes.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ListingRecord>,
    pub batches: Vec<usize>,
    pub fail: bool,
}

impl RecordSink for MemorySink {
    fn append(&mut self, records: &[ListingRecord]) -> Result<()> {
        if self.fail {
            bail!("disk full");
        }
        self.records.extend_from_slice(records);
        self.batches.push(records.len());
        Ok(())
    }
}
