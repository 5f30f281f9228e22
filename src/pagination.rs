use crate::browser::Browser;
use crate::extractor::ListingExtractor;
use crate::models::SearchTarget;
use crate::observer::ScrapeObserver;
use crate::recipe::SiteRecipe;
use crate::store::{AccumulationStore, RecordSink};
use anyhow::Result;
use log::{debug, warn};
use std::fmt;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Loading,
    Scrolling,
    QuotaMet,
    Exhausted,
    Stalled,
}

/// Why the driver stopped working a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    QuotaMet,
    Exhausted,
    Stalled,
}

impl From<Termination> for PageState {
    fn from(termination: Termination) -> Self {
        match termination {
            Termination::QuotaMet => PageState::QuotaMet,
            Termination::Exhausted => PageState::Exhausted,
            Termination::Stalled => PageState::Stalled,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::QuotaMet => "quota met",
            Termination::Exhausted => "end of list",
            Termination::Stalled => "stalled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub termination: Termination,
    pub captured: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub scrolls: usize,
}

pub struct PaginationDriver<'a> {
    recipe: &'a SiteRecipe,
    extractor: ListingExtractor<'a>,
    settle_delay: Duration,
    max_stall_scrolls: usize,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        recipe: &'a SiteRecipe,
        extractor: ListingExtractor<'a>,
        settle_delay: Duration,
        max_stall_scrolls: usize,
    ) -> Self {
        Self {
            recipe,
            extractor,
            settle_delay,
            max_stall_scrolls,
        }
    }

    /// Work one target's result list until the quota is met, the list ends,
    /// or scrolling stops producing new listings.
    ///
    /// `quota` is the number of listings the (category, city) pair should
    /// hold, counting ones captured earlier. Only newly accepted listings
    /// move towards it; duplicates do not. The only error is a failed flush.
    pub fn drive<B: Browser, S: RecordSink>(
        &self,
        browser: &mut B,
        target: &SearchTarget,
        initial: Vec<B::Element>,
        quota: usize,
        store: &mut AccumulationStore<S>,
        observer: &mut dyn ScrapeObserver,
    ) -> Result<TargetReport> {
        let mut report = TargetReport {
            termination: Termination::QuotaMet,
            captured: store.captured(target),
            accepted: 0,
            duplicates: 0,
            skipped: 0,
            scrolls: 0,
        };

        let mut state = PageState::Loading;
        if report.captured >= quota {
            return Ok(report);
        }

        let mut visible = initial;
        let mut processed = 0;
        let mut stalls = 0;
        transition(target, &mut state, PageState::Scrolling, visible.len());

        loop {
            for handle in visible.iter().skip(processed) {
                processed += 1;

                match self.extractor.extract(browser, handle, target) {
                    Ok(record) => {
                        let name = record.name.clone();
                        if store.add(record)? {
                            report.captured += 1;
                            report.accepted += 1;
                            debug!("Captured '{}' for {} ({}/{})", name, target, report.captured, quota);
                            observer.listing_accepted(target, report.captured, quota);
                        } else {
                            report.duplicates += 1;
                            debug!("Duplicate '{}' for {}", name, target);
                            observer.listing_duplicate(target);
                        }
                    }
                    Err(skip) => {
                        report.skipped += 1;
                        warn!("Skipping listing #{} for {}: {}", processed, target, skip);
                        observer.listing_skipped(target, &skip.to_string());
                    }
                }

                if report.captured >= quota {
                    return Ok(finish(target, &mut state, report, Termination::QuotaMet));
                }
            }

            if browser.is_present(&self.recipe.end_of_list) {
                return Ok(finish(target, &mut state, report, Termination::Exhausted));
            }

            if let Err(e) = browser.scroll(&self.recipe.results_feed) {
                debug!("Scroll failed for {}: {}", target, e);
            }
            report.scrolls += 1;
            if !self.settle_delay.is_zero() {
                thread::sleep(self.settle_delay);
            }

            let previous = visible.len();
            match browser.find_all(&self.recipe.listing) {
                Ok(found) => visible = found,
                Err(e) => debug!("Could not re-count listings for {}: {}", target, e),
            }

            if visible.len() == previous {
                if browser.is_present(&self.recipe.end_of_list) {
                    return Ok(finish(target, &mut state, report, Termination::Exhausted));
                }
                stalls += 1;
                debug!("No new listings for {} ({}/{})", target, stalls, self.max_stall_scrolls);
                if stalls >= self.max_stall_scrolls {
                    return Ok(finish(target, &mut state, report, Termination::Stalled));
                }
            } else {
                stalls = 0;
            }
            observer.scrolled(target, visible.len(), stalls);
        }
    }
}

fn transition(target: &SearchTarget, state: &mut PageState, next: PageState, visible: usize) {
    debug!("{}: {:?} -> {:?} ({} visible)", target, state, next, visible);
    *state = next;
}

fn finish(
    target: &SearchTarget,
    state: &mut PageState,
    mut report: TargetReport,
    termination: Termination,
) -> TargetReport {
    transition(target, state, termination.into(), report.captured);
    report.termination = termination;
    report
}
