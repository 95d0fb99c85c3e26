// Entry point and page navigation.
//
// - `--page revenue|review` renders one page and exits.
// - Without it, a menu switches between the two pages and lets the user
//   change the platform/location filters. Each visit recomputes the page
//   from datasets that are loaded once per session.
mod cache;
mod config;
mod error;
mod filter;
mod loader;
mod output;
mod review;
mod revenue;
mod types;
mod util;

use anyhow::{Context, Result};
use cache::DatasetCache;
use config::{Config, Page};
use filter::FilterSelection;
use loader::LoadReport;
use std::io::{self, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::ReviewsDataset;

/// Everything that lives for one run: settings, cached data, current filters.
struct Session {
    config: Config,
    cache: DatasetCache,
    platforms: Option<Vec<String>>,
    locations: Option<Vec<String>>,
}

impl Session {
    fn new(config: Config) -> Self {
        let cache = DatasetCache::new(config.orders_path.clone(), config.reviews_path.clone());
        Session {
            platforms: config.platforms.clone(),
            locations: config.locations.clone(),
            config,
            cache,
        }
    }

    /// Orders page: no platform choice means no platform filter.
    fn revenue_selection(&self) -> FilterSelection {
        FilterSelection::new(
            self.platforms.clone().unwrap_or_default(),
            Vec::<String>::new(),
        )
    }

    /// Reviews page: no choice means every option in the dataset.
    fn review_selection(&self, data: &ReviewsDataset) -> FilterSelection {
        FilterSelection::new(
            self.platforms
                .clone()
                .unwrap_or_else(|| filter::review_platform_options(data)),
            self.locations
                .clone()
                .unwrap_or_else(|| filter::review_location_options(data)),
        )
    }

    fn show_revenue(&self) -> error::Result<()> {
        let (data, load_report) = self.cache.orders()?;
        print_load_note("orders", load_report);
        let sel = self.revenue_selection();
        let report = revenue::analyze(data, &sel);
        output::print_revenue(&report, &sel, self.config.preview_rows);
        if let Some(dir) = &self.config.export_dir {
            output::export_revenue(dir, &report, &sel)?;
            println!("Revenue: {}", output::kpi_digest(&report));
            println!("(Full tables exported to {})\n", dir.display());
        }
        Ok(())
    }

    fn show_review(&self) -> error::Result<()> {
        let (data, load_report) = self.cache.reviews()?;
        print_load_note("reviews", load_report);
        let sel = self.review_selection(data);
        let report = review::analyze(data, &sel);
        output::print_review(&report, &sel, self.config.preview_rows);
        if let Some(dir) = &self.config.export_dir {
            output::export_review(dir, &report, &sel)?;
            println!("(Full tables exported to {})\n", dir.display());
        }
        Ok(())
    }

    fn show(&self, page: Page) -> error::Result<()> {
        info!(?page, "rendering page");
        match page {
            Page::Revenue => self.show_revenue(),
            Page::Review => self.show_review(),
        }
    }

    fn change_filters(&mut self) {
        if let Ok((data, _)) = self.cache.orders() {
            println!(
                "Order platforms: {}",
                filter::order_platform_options(data).join(", ")
            );
        }
        if let Ok((data, _)) = self.cache.reviews() {
            println!(
                "Review platforms: {}",
                filter::review_platform_options(data).join(", ")
            );
            println!(
                "Review locations: {}",
                filter::review_location_options(data).join(", ")
            );
        }
        println!("Comma separated; blank selects all, `none` clears the selection.");
        if let Some(input) = read_line("Platforms: ") {
            self.platforms = parse_list(&input);
        }
        if let Some(input) = read_line("Locations: ") {
            self.locations = parse_list(&input);
        }
        println!();
    }
}

fn print_load_note(kind: &str, report: &LoadReport) {
    println!(
        "Dataset: {} {} rows loaded",
        util::format_int(report.loaded_rows),
        kind
    );
    if report.coerced_values > 0 {
        println!(
            "Note: {} unparseable values were treated as 0.",
            util::format_int(report.coerced_values)
        );
    }
    if report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse errors.",
            util::format_int(report.parse_errors)
        );
    }
    println!();
}

/// Print a prompt and read one trimmed line. `None` on end of input.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Blank keeps the default (all options); `none` is an explicit empty
/// selection; anything else is a comma separated list.
fn parse_list(input: &str) -> Option<Vec<String>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input.eq_ignore_ascii_case("none") {
        return Some(Vec::new());
    }
    Some(
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn run_menu(session: &mut Session) {
    loop {
        println!("E-commerce Performance Dashboard");
        println!("[1] Revenue Analysis");
        println!("[2] Review Analysis");
        println!("[3] Change Filters");
        println!("[4] Exit\n");
        let Some(choice) = read_line("Enter choice: ") else {
            break;
        };
        println!();
        let page = match choice.as_str() {
            "1" => Page::Revenue,
            "2" => Page::Review,
            "3" => {
                session.change_filters();
                continue;
            }
            "4" => break,
            _ => {
                println!("Invalid choice. Please enter 1, 2, 3 or 4.\n");
                continue;
            }
        };
        // A failing page leaves the other one usable.
        if let Err(e) = session.show(page) {
            error!(error = %e, "page failed");
            eprintln!("Failed to render page: {}\n", e);
        }
    }
    println!("Exiting the program.");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let config = Config::from_args();
    info!(
        orders = %config.orders_path.display(),
        reviews = %config.reviews_path.display(),
        "dashboard starting"
    );

    let mut session = Session::new(config);
    match session.config.page {
        Some(page) => session
            .show(page)
            .with_context(|| format!("failed to render the {:?} page", page))?,
        None => run_menu(&mut session),
    }
    Ok(())
}
