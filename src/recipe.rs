//! Where things are on the target site.
//!
//! Selectors here track the live Google Maps markup and go stale without
//! warning. Nothing outside this module knows about them.

use crate::browser::Locator;
use crate::extractor::{AttrOf, ExtractionRecipe, FirstOf, ListingLabel, ListingLink, PageUrl, TextOf};

pub struct SiteRecipe {
    pub home_url: String,
    pub search_url_prefix: String,
    /// Present once the search UI has resolved into a result list.
    pub results_ready: Locator,
    /// Scrollable container holding the result list.
    pub results_feed: Locator,
    pub listing: Locator,
    pub listing_label_attr: String,
    pub end_of_list: Locator,
    pub no_results: Locator,
    /// The detail view's heading. Present once a detail view has opened,
    /// and its text names the listing shown.
    pub detail_ready: Locator,
    pub fields: ExtractionRecipe,
}

impl SiteRecipe {
    pub fn search_url(&self, query: &str) -> String {
        format!("{}{}", self.search_url_prefix, urlencoding::encode(query))
    }

    pub fn google_maps() -> Self {
        let feed = r#"div[role="feed"]"#;

        SiteRecipe {
            home_url: "https://www.google.com/maps".to_string(),
            search_url_prefix: "https://www.google.com/maps/search/".to_string(),
            results_ready: Locator::css(feed),
            results_feed: Locator::css(feed),
            listing: Locator::css(format!("{} a.hfpxzc", feed)),
            listing_label_attr: "aria-label".to_string(),
            end_of_list: Locator::xpath(r#"//*[contains(text(), "You've reached the end of the list")]"#),
            no_results: Locator::xpath(r#"//*[contains(text(), "Google Maps can't find")]"#),
            detail_ready: Locator::css("h1.DUwDvf"),
            fields: ExtractionRecipe {
                name: Box::new(FirstOf(vec![
                    Box::new(TextOf(Locator::css("h1.DUwDvf"))),
                    Box::new(ListingLabel),
                ])),
                address: Box::new(AttrOf(
                    Locator::css(r#"button[data-item-id="address"]"#),
                    "aria-label".to_string(),
                )),
                website: Box::new(AttrOf(
                    Locator::css(r#"a[data-item-id="authority"]"#),
                    "href".to_string(),
                )),
                phone: Box::new(AttrOf(
                    Locator::css(r#"button[data-item-id^="phone:tel:"]"#),
                    "aria-label".to_string(),
                )),
                review_count: Box::new(AttrOf(
                    Locator::css(r#"div.F7nice span[aria-label*="review"]"#),
                    "aria-label".to_string(),
                )),
                review_average: Box::new(TextOf(Locator::css(
                    r#"div.F7nice span[aria-hidden="true"]"#,
                ))),
                coordinates: Box::new(FirstOf(vec![Box::new(ListingLink), Box::new(PageUrl)])),
            },
        }
    }
}
