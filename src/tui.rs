use crate::models::SearchTarget;
use crate::observer::ScrapeObserver;
use crate::pagination::Termination;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner} [{bar:30}] {pos}/{len} ({percent}%) {msg}";

/// Progress bar for overall quota progress plus one coloured line per
/// finished or skipped target.
pub struct ConsoleObserver {
    bar: ProgressBar,
    duplicates: usize,
    skipped: usize,
    targets_done: usize,
    targets_skipped: usize,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            duplicates: 0,
            skipped: 0,
            targets_done: 0,
            targets_skipped: 0,
        }
    }

    fn line(&self, color: Color, text: String) {
        self.bar.suspend(|| {
            let result = execute!(
                io::stdout(),
                SetForegroundColor(color),
                Print(text),
                Print("\n"),
                ResetColor
            );
            if let Err(e) = result {
                log::debug!("Could not write status line: {}", e);
            }
        });
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeObserver for ConsoleObserver {
    fn run_started(&mut self, already_captured: usize, planned: usize) {
        self.line(
            Color::DarkGrey,
            format!("📁 {} listings already on disk", already_captured),
        );

        let length = planned.max(already_captured) as u64;
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█░");
        self.bar = ProgressBar::new(length).with_style(style);
        self.bar.set_position(already_captured as u64);
        self.bar.enable_steady_tick(Duration::from_millis(120));
    }

    fn target_started(&mut self, target: &SearchTarget, captured: usize, quota: usize) {
        self.bar.set_message(format!("{} ({}/{})", target, captured, quota));
    }

    fn target_skipped(&mut self, target: &SearchTarget, reason: &str) {
        self.targets_skipped += 1;
        self.line(Color::Yellow, format!("⚠️  {}: {}", target, reason));
    }

    fn listing_accepted(&mut self, target: &SearchTarget, captured: usize, quota: usize) {
        self.bar.inc(1);
        self.bar.set_message(format!("{} ({}/{})", target, captured, quota));
    }

    fn listing_duplicate(&mut self, _target: &SearchTarget) {
        self.duplicates += 1;
    }

    fn listing_skipped(&mut self, _target: &SearchTarget, _reason: &str) {
        self.skipped += 1;
    }

    fn target_finished(&mut self, target: &SearchTarget, termination: Termination, captured: usize) {
        self.targets_done += 1;
        let (color, icon) = match termination {
            Termination::QuotaMet => (Color::Green, "✅"),
            Termination::Exhausted => (Color::Cyan, "🏁"),
            Termination::Stalled => (Color::Yellow, "⏸️ "),
        };
        self.line(color, format!("{} {}: {} listings, {}", icon, target, captured, termination));
    }

    fn run_finished(&mut self, captured: usize) {
        self.bar.finish_and_clear();
        self.line(Color::White, "─".repeat(80));
        self.line(
            Color::Green,
            format!(
                "✅ {} targets done, {} skipped | {} duplicates, {} listings skipped | {} listings on disk",
                self.targets_done, self.targets_skipped, self.duplicates, self.skipped, captured
            ),
        );
    }
}
