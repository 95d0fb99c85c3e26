use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "platform-dashboard")]
#[command(about = "Revenue and review analysis across e-commerce platforms")]
pub struct Args {
    /// Orders CSV (Order ID, Platform, Order Value (INR), ...)
    #[arg(long, env = "DASHBOARD_ORDERS", default_value = "Sales/Revenue.csv")]
    pub orders: PathBuf,

    /// Reviews CSV (Agent Name, Location, Customer Service Rating, ...)
    #[arg(long, env = "DASHBOARD_REVIEWS", default_value = "Sales/Reviews.csv")]
    pub reviews: PathBuf,

    /// Directory the report tables are exported to
    #[arg(long, env = "DASHBOARD_OUT_DIR", default_value = "reports")]
    pub out_dir: PathBuf,

    /// Only preview tables, do not write CSV/JSON files
    #[arg(long)]
    pub no_export: bool,

    /// Platforms to include (repeatable or comma separated; default: all)
    #[arg(long = "platform", value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Review locations to include (repeatable or comma separated; default: all)
    #[arg(long = "location", value_delimiter = ',')]
    pub locations: Vec<String>,

    /// Render one page and exit instead of opening the menu
    #[arg(long, value_enum)]
    pub page: Option<Page>,

    /// Rows shown per table in the console preview
    #[arg(long, default_value_t = 10)]
    pub preview_rows: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Revenue,
    Review,
}

/// Resolved settings for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub orders_path: PathBuf,
    pub reviews_path: PathBuf,
    pub export_dir: Option<PathBuf>,
    /// `None` selects every option the dataset offers.
    pub platforms: Option<Vec<String>>,
    pub locations: Option<Vec<String>>,
    pub page: Option<Page>,
    pub preview_rows: usize,
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    let values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            orders_path: args.orders,
            reviews_path: args.reviews,
            export_dir: (!args.no_export).then_some(args.out_dir),
            platforms: non_empty(args.platforms),
            locations: non_empty(args.locations),
            page: args.page,
            preview_rows: args.preview_rows,
        }
    }
}

impl Config {
    pub fn from_args() -> Self {
        Args::parse().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Config {
        Args::try_parse_from(argv).unwrap().into()
    }

    #[test]
    fn defaults_select_everything() {
        let cfg = parse(&["platform-dashboard"]);
        assert_eq!(cfg.platforms, None);
        assert_eq!(cfg.locations, None);
        assert_eq!(cfg.export_dir, Some(PathBuf::from("reports")));
        assert_eq!(cfg.page, None);
        assert_eq!(cfg.preview_rows, 10);
    }

    #[test]
    fn filters_accept_commas_and_repeats() {
        let cfg = parse(&[
            "platform-dashboard",
            "--platform",
            "Swiggy, Blinkit",
            "--platform",
            "JioMart",
            "--location=Delhi",
            "--page",
            "review",
            "--no-export",
        ]);
        assert_eq!(
            cfg.platforms,
            Some(vec!["Swiggy".into(), "Blinkit".into(), "JioMart".into()])
        );
        assert_eq!(cfg.locations, Some(vec!["Delhi".into()]));
        assert_eq!(cfg.page, Some(Page::Review));
        assert_eq!(cfg.export_dir, None);
    }
}
