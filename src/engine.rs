use crate::browser::Browser;
use crate::config::{QuotaScope, ScrapingOptions};
use crate::extractor::ListingExtractor;
use crate::models::{City, SearchTarget};
use crate::observer::ScrapeObserver;
use crate::pagination::{PaginationDriver, TargetReport, Termination};
use crate::recipe::SiteRecipe;
use crate::search::{search, SearchOutcome};
use crate::store::{AccumulationStore, RecordSink};
use crate::targets::{enumerator_for, Enumeration};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::fmt;

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub accepted: usize,
    pub duplicates: usize,
    pub skipped_listings: usize,
    pub empty_targets: usize,
    pub failed_targets: usize,
    pub quota_met: usize,
    pub exhausted: usize,
    pub stalled: usize,
    /// Rows in the output file once the run ended, including earlier runs.
    pub total_captured: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &TargetReport) {
        self.accepted += report.accepted;
        self.duplicates += report.duplicates;
        self.skipped_listings += report.skipped;
        match report.termination {
            Termination::QuotaMet => self.quota_met += 1,
            Termination::Exhausted => self.exhausted += 1,
            Termination::Stalled => self.stalled += 1,
        }
    }

    pub fn targets_searched(&self) -> usize {
        self.quota_met + self.exhausted + self.stalled + self.empty_targets
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new listings ({} duplicates, {} skipped); targets: {} quota met, {} end of list, {} stalled, {} empty, {} failed; {} listings on disk",
            self.accepted,
            self.duplicates,
            self.skipped_listings,
            self.quota_met,
            self.exhausted,
            self.stalled,
            self.empty_targets,
            self.failed_targets,
            self.total_captured
        )
    }
}

/// Drives one browser through every selected (category, city) pair.
pub struct Engine<'a, B: Browser, S: RecordSink> {
    browser: &'a mut B,
    recipe: &'a SiteRecipe,
    options: &'a ScrapingOptions,
    store: &'a mut AccumulationStore<S>,
    observer: &'a mut dyn ScrapeObserver,
}

impl<'a, B: Browser, S: RecordSink> Engine<'a, B, S> {
    pub fn new(
        browser: &'a mut B,
        recipe: &'a SiteRecipe,
        options: &'a ScrapingOptions,
        store: &'a mut AccumulationStore<S>,
        observer: &'a mut dyn ScrapeObserver,
    ) -> Self {
        Self {
            browser,
            recipe,
            options,
            store,
            observer,
        }
    }

    /// Crawl `categories` × `cities`, picking up where the output file left off.
    ///
    /// Buffered listings are flushed before returning, on the error path too.
    /// The only errors are fatal ones: the output could not be written.
    pub fn run(&mut self, categories: &[String], cities: &[City]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let outcome = self.crawl(categories, cities, &mut summary);

        let flushed = self.flush();
        match (outcome, flushed) {
            (Err(e), flushed) => {
                if let Err(flush_error) = flushed {
                    error!("Final flush failed as well: {:#}", flush_error);
                }
                Err(e)
            }
            (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(_)) => {
                summary.total_captured = self.store.total_captured();
                self.observer.run_finished(summary.total_captured);
                info!("Run complete: {}", summary);
                Ok(summary)
            }
        }
    }

    fn crawl(&mut self, categories: &[String], cities: &[City], summary: &mut RunSummary) -> Result<()> {
        let resume = self.store.checkpoint().resume_point().cloned();
        let categories = match &resume {
            Some(point) => {
                info!("Resuming from {} in {} {}", point.category, point.city, point.state);
                point.remaining_categories(categories)
            }
            None => categories,
        };

        let planned = match self.options.quota_scope {
            QuotaScope::PerTarget => categories.len() * cities.len() * self.options.quota,
            QuotaScope::PerCategory => categories.len() * self.options.quota,
        };
        self.observer.run_started(self.store.total_captured(), planned);

        let recipe: &'a SiteRecipe = self.recipe;
        let timing = &self.options.timing;
        let extractor = ListingExtractor::new(
            recipe,
            self.options.max_open_attempts,
            timing.retry_backoff,
            timing.detail_timeout,
        );
        let driver = PaginationDriver::new(recipe, extractor, timing.settle_delay, self.options.max_stall_scrolls);

        for category in categories {
            let cities = match (&resume, self.options.enumeration) {
                (Some(point), Enumeration::Ordered) => point.remaining_cities(category, cities),
                _ => cities,
            };
            let mut targets = enumerator_for(self.options.enumeration, category, cities, self.options.seed);
            info!("Category '{}': {} cities to visit", category, targets.remaining());

            while let Some(target) = targets.next_target() {
                let quota = match self.target_quota(&target) {
                    Some(quota) => quota,
                    None => {
                        info!("Category '{}' reached its quota of {}", category, self.options.quota);
                        break;
                    }
                };

                let captured = self.store.captured(&target);
                if captured >= quota {
                    debug!("{} already has {}/{} listings", target, captured, quota);
                    continue;
                }

                self.observer.target_started(&target, captured, quota);
                self.visit(&driver, &target, quota, summary)?;
            }

            self.flush()?;
        }

        Ok(())
    }

    /// How many listings `target`'s pair should end up with, or `None` once
    /// its whole category is done.
    fn target_quota(&self, target: &SearchTarget) -> Option<usize> {
        match self.options.quota_scope {
            QuotaScope::PerTarget => Some(self.options.quota),
            QuotaScope::PerCategory => {
                let left = self
                    .options
                    .quota
                    .saturating_sub(self.store.captured_in_category(&target.category));
                if left == 0 {
                    None
                } else {
                    Some(self.store.captured(target) + left)
                }
            }
        }
    }

    fn visit(
        &mut self,
        driver: &PaginationDriver<'_>,
        target: &SearchTarget,
        quota: usize,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let handles = match search(&mut *self.browser, self.recipe, target, self.options.timing.search_timeout) {
            Ok(SearchOutcome::Results(handles)) => handles,
            Ok(SearchOutcome::Empty) => {
                info!("No results for {}", target);
                summary.empty_targets += 1;
                self.observer.target_skipped(target, "no results");
                return Ok(());
            }
            Err(e) => {
                warn!("Skipping {}: {}", target, e);
                summary.failed_targets += 1;
                self.observer.target_skipped(target, &e.to_string());
                return Ok(());
            }
        };

        let written_before = self.store.checkpoint().total();
        let report = driver.drive(&mut *self.browser, target, handles, quota, &mut *self.store, &mut *self.observer)?;
        let written = self.store.checkpoint().total() - written_before;
        if written > 0 {
            self.observer.flushed(written);
        }

        info!(
            "Finished {}: {} with {}/{} listings ({} new, {} duplicates, {} skipped)",
            target,
            report.termination,
            report.captured,
            quota,
            report.accepted,
            report.duplicates,
            report.skipped
        );
        self.observer.target_finished(target, report.termination, report.captured);
        summary.absorb(&report);
        Ok(())
    }

    fn flush(&mut self) -> Result<usize> {
        let written = self.store.flush()?;
        if written > 0 {
            self.observer.flushed(written);
        }
        Ok(written)
    }
}
