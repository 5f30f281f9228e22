use anyhow::{bail, Context, Result};
use clap::Parser;
use mapfinder::browser::Browser;
use mapfinder::config::{QuotaScope, ScrapingOptions, Timing};
use mapfinder::engine::{Engine, RunSummary};
use mapfinder::logger;
use mapfinder::progress::ProgressCheckpoint;
use mapfinder::recipe::SiteRecipe;
use mapfinder::reference::{self, BUSINESS_TYPES, CATEGORY_LIST_VERSION};
use mapfinder::store::{AccumulationStore, CsvSink};
use mapfinder::targets::Enumeration;
use mapfinder::tui::ConsoleObserver;
use mapfinder::webdriver::FirefoxSession;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Mapfinder - Google Maps business listing scraper")]
struct Args {
    /// Path to output CSV file (appended to, and used to resume)
    #[clap(short, long, default_value = "scraped_results.csv")]
    output: PathBuf,

    /// City reference CSV (city_ascii/city and state_id/state columns)
    #[clap(long, default_value = "uscities.csv")]
    cities: PathBuf,

    /// Business types to scrape by number, e.g. "3", "1-5", "2-4,9" (asked if omitted)
    #[clap(short, long)]
    categories: Option<String>,

    /// Listings to capture per city (or per category, see --quota-scope; asked if omitted)
    #[clap(short, long)]
    quota: Option<usize>,

    #[clap(long, value_enum, default_value = "per-target")]
    quota_scope: QuotaScope,

    /// Order in which cities are visited
    #[clap(short, long, value_enum, default_value = "ordered")]
    enumeration: Enumeration,

    /// Seed for random enumeration
    #[clap(long)]
    seed: Option<u64>,

    /// Write to disk after this many new listings
    #[clap(long, default_value = "10")]
    batch_size: usize,

    /// Give up on a result list after this many scrolls without new listings
    #[clap(long, default_value = "10")]
    max_stall_scrolls: usize,

    /// Attempts to open a listing before skipping it
    #[clap(long, default_value = "5")]
    max_open_attempts: usize,

    /// Seconds to wait for search results
    #[clap(long, default_value = "15")]
    search_timeout: u64,

    /// Milliseconds to wait after each scroll
    #[clap(long, default_value = "2000")]
    settle_delay: u64,

    /// WebDriver (geckodriver) server
    #[clap(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    webdriver_url: String,

    /// Show the browser window
    #[clap(long)]
    headed: bool,

    /// Print the business types and exit
    #[clap(long)]
    list_categories: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn options(&self, quota: usize) -> ScrapingOptions {
        ScrapingOptions {
            output_file: self.output.clone(),
            cities_file: self.cities.clone(),
            quota,
            quota_scope: self.quota_scope,
            enumeration: self.enumeration,
            seed: self.seed,
            flush_batch_size: self.batch_size,
            max_stall_scrolls: self.max_stall_scrolls,
            max_open_attempts: self.max_open_attempts,
            timing: Timing {
                search_timeout: Duration::from_secs(self.search_timeout),
                settle_delay: Duration::from_millis(self.settle_delay),
                ..Timing::default()
            },
            webdriver_url: self.webdriver_url.clone(),
            headless: !self.headed,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.debug);

    if args.list_categories {
        print_categories();
        return Ok(());
    }

    println!("Mapfinder - Google Maps Listing Scraper");
    println!("=======================================");

    let categories = match &args.categories {
        Some(selection) => reference::select_categories(selection)?,
        None => prompt_categories()?,
    };
    let quota = match args.quota {
        Some(0) => bail!("--quota must be at least 1"),
        Some(quota) => quota,
        None => prompt_quota()?,
    };
    let options = args.options(quota);
    log::info!("Selected {} business types, {} listings each", categories.len(), quota);

    let cities = reference::load_cities(&options.cities_file)?;
    let checkpoint = ProgressCheckpoint::load(&options.output_file)?;
    let mut store = AccumulationStore::resuming(
        CsvSink::new(&options.output_file),
        options.flush_batch_size,
        checkpoint,
    );

    let recipe = SiteRecipe::google_maps();
    let mut browser = FirefoxSession::connect(&options.webdriver_url, options.headless)
        .context("Failed to start Firefox; is geckodriver running?")?;
    open_home(&mut browser, &recipe, &options);

    let mut observer = ConsoleObserver::new();
    let outcome = Engine::new(&mut browser, &recipe, &options, &mut store, &mut observer)
        .run(&categories, &cities);

    if let Err(e) = browser.quit() {
        log::warn!("Failed to close browser: {}", e);
    }

    let summary = outcome?;
    print_summary(&summary, &options);
    Ok(())
}

fn open_home(browser: &mut FirefoxSession, recipe: &SiteRecipe, options: &ScrapingOptions) {
    match browser.navigate(&recipe.home_url) {
        Ok(()) => thread::sleep(options.timing.settle_delay),
        Err(e) => log::warn!("Could not open {}: {}", recipe.home_url, e),
    }
}

fn print_categories() {
    println!("Business types (list version {}):", CATEGORY_LIST_VERSION);
    for (i, business) in BUSINESS_TYPES.iter().enumerate() {
        println!("{:>3}. {}", i + 1, business);
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        bail!("No input given");
    }
    Ok(input.trim().to_string())
}

fn prompt_categories() -> Result<Vec<String>> {
    print_categories();
    loop {
        let input = read_line("Enter your choice (e.g. 3, 1-5 or 2-4,9): ")?;
        match reference::select_categories(&input) {
            Ok(categories) => return Ok(categories),
            Err(e) => println!("Invalid selection: {}", e),
        }
    }
}

fn prompt_quota() -> Result<usize> {
    loop {
        let input = read_line("How many listings do you want to capture for each business type? ")?;
        match input.parse::<usize>() {
            Ok(quota) if quota > 0 => return Ok(quota),
            _ => println!("Please enter a positive number"),
        }
    }
}

fn print_summary(summary: &RunSummary, options: &ScrapingOptions) {
    println!("\n=== Summary ===");
    println!("New listings captured: {}", summary.accepted);
    println!("Duplicates ignored: {}", summary.duplicates);
    println!("Listings skipped: {}", summary.skipped_listings);
    println!(
        "Targets searched: {} ({} quota met, {} end of list, {} stalled, {} empty)",
        summary.targets_searched(),
        summary.quota_met,
        summary.exhausted,
        summary.stalled,
        summary.empty_targets
    );
    println!("Targets failed: {}", summary.failed_targets);
    println!("Total listings on disk: {}", summary.total_captured);
    println!("Saved to: {}", options.output_file.display());
}
