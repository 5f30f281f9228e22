use crate::models::SearchTarget;
use crate::pagination::Termination;

/// Callbacks for anything that wants to follow a run, e.g. a progress display.
///
/// Every method has a no-op default.
pub trait ScrapeObserver {
    fn run_started(&mut self, _already_captured: usize, _planned: usize) {}

    fn target_started(&mut self, _target: &SearchTarget, _captured: usize, _quota: usize) {}

    fn target_skipped(&mut self, _target: &SearchTarget, _reason: &str) {}

    fn listing_accepted(&mut self, _target: &SearchTarget, _captured: usize, _quota: usize) {}

    fn listing_duplicate(&mut self, _target: &SearchTarget) {}

    fn listing_skipped(&mut self, _target: &SearchTarget, _reason: &str) {}

    fn scrolled(&mut self, _target: &SearchTarget, _visible: usize, _stalls: usize) {}

    fn target_finished(&mut self, _target: &SearchTarget, _termination: Termination, _captured: usize) {}

    fn flushed(&mut self, _written: usize) {}

    fn run_finished(&mut self, _captured: usize) {}
}

pub struct NoopObserver;

impl ScrapeObserver for NoopObserver {}
