// Console rendering and file export of page results.
use crate::error::{Result, Section};
use crate::filter::FilterSelection;
use crate::review::ReviewReport;
use crate::revenue::RevenueReport;
use crate::types::{FeedbackMatrix, PlatformUsageReport, ReviewSnapshot};
use crate::util::{format_inr, format_int, format_number};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::{info, warn};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows.len() > max_rows {
        println!("({} more rows)", format_int(rows.len() - max_rows));
    }
    println!();
}

/// Print a section heading followed by its body, or the reason it is withheld.
fn section<T>(title: &str, s: &Section<T>, body: impl FnOnce(&T)) {
    println!("## {}\n", title);
    match s {
        Section::Ready(v) => body(v),
        Section::Withheld(notice) => println!("ℹ️  {}\n", notice),
    }
}

fn feedback_table(m: &FeedbackMatrix) -> String {
    let mut builder = Builder::default();
    builder.push_record(std::iter::once("Location".to_string()).chain(m.platforms.iter().cloned()));
    for row in m.rows() {
        builder.push_record(row.cells());
    }
    builder.build().with(Style::markdown()).to_string()
}

fn selection_line(label: &str, values: impl Iterator<Item = impl AsRef<str>>) -> String {
    let values: Vec<String> = values.map(|v| v.as_ref().to_string()).collect();
    if values.is_empty() {
        format!("{}: (none)", label)
    } else {
        format!("{}: {}", label, values.join(", "))
    }
}

pub fn print_revenue(report: &RevenueReport, sel: &FilterSelection, max_rows: usize) {
    println!("# Revenue Analysis\n");
    if sel.selected_platforms.is_empty() {
        println!("Platforms: all\n");
    } else {
        println!("{}\n", selection_line("Platforms", sel.selected_platforms.iter()));
    }

    println!("## KPI Summary\n");
    println!("Total Revenue:       {}", format_inr(report.kpi.total_revenue, 0));
    println!("Average Order Value: {}", format_inr(report.kpi.average_order_value, 2));
    println!("Total Orders:        {}\n", format_int(report.kpi.total_orders));

    section("Total Orders (per Platform)", &report.orders_per_platform, |rows| {
        preview_table_rows(rows, max_rows)
    });
    section("Platform-wise Total Sales", &report.sales_per_platform, |rows| {
        preview_table_rows(rows, max_rows)
    });
    section(
        "Most & Least Ordered Category per Platform",
        &report.category_ranking,
        |ranking| {
            preview_table_rows(&ranking.top_bottom, max_rows);
            println!("Category breakdown per platform (percentage)\n");
            preview_table_rows(&ranking.shares, max_rows);
        },
    );
    section(
        "Revenue per Order by Platform (INR)",
        &report.revenue_per_order,
        |rows| preview_table_rows(rows, max_rows),
    );
    section("Category Contribution % per Platform", &report.contribution, |rows| {
        preview_table_rows(rows, max_rows)
    });
}

pub fn print_review(report: &ReviewReport, sel: &FilterSelection, max_rows: usize) {
    println!("# Review Analysis\n");
    println!("{}", selection_line("Platforms", sel.selected_platforms.iter()));
    println!("{}\n", selection_line("Locations", sel.selected_locations.iter()));

    section("Key Metrics", &report.snapshot, |snap| {
        println!("Avg Delivery Time ({}):    {}", snap.agent, snap.delivery_time);
        println!("Avg Customer Rating ({}):  {:.1} ⭐", snap.agent, snap.avg_rating);
        println!("Order Accuracy ({}):       {:.1}%", snap.agent, snap.order_accuracy_pct);
        println!(
            "Product Availability ({}): {:.1}%\n",
            snap.agent, snap.product_availability_pct
        );
    });
    section(
        "Average Delivery Time per Platform",
        &report.delivery_times,
        |rows| preview_table_rows(rows, max_rows),
    );
    section("Platform Usage per Location", &report.platform_usage, |usage| {
        match usage {
            PlatformUsageReport::WinnerPerLocation { winners } => {
                preview_table_rows(winners, max_rows)
            }
            PlatformUsageReport::SingleLocationDistribution { location, usage } => {
                println!("Platform usage in {}\n", location);
                preview_table_rows(usage, max_rows);
            }
        }
    });
    section(
        "Average Customer Feedback per Platform & Location",
        &report.feedback,
        |m| println!("{}\n", feedback_table(m)),
    );
    section(
        "Order Accuracy & Product Availability per Platform",
        &report.quality,
        |rows| preview_table_rows(rows, max_rows),
    );
}

/// Export a ready section's rows; withheld sections are skipped.
fn export_rows<T: Serialize>(dir: &Path, file: &str, rows: Option<&Vec<T>>) -> Option<String> {
    let rows = rows?;
    let path = dir.join(file);
    match write_csv(&path, rows) {
        Ok(()) => Some(file.to_string()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "write error");
            None
        }
    }
}

fn withheld_notes(
    sections: impl IntoIterator<Item = (&'static str, Option<String>)>,
) -> BTreeMap<&'static str, String> {
    sections
        .into_iter()
        .filter_map(|(name, note)| note.map(|n| (name, n)))
        .collect()
}

#[derive(Serialize)]
struct RevenueSummary<'a> {
    platforms: Vec<&'a str>,
    total_revenue: f64,
    total_revenue_display: String,
    average_order_value: f64,
    total_orders: usize,
    files: Vec<String>,
    withheld: BTreeMap<&'static str, String>,
}

pub fn export_revenue(dir: &Path, report: &RevenueReport, sel: &FilterSelection) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let ranking = report.category_ranking.ready();
    let files: Vec<String> = [
        export_rows(dir, "orders_per_platform.csv", report.orders_per_platform.ready()),
        export_rows(dir, "sales_per_platform.csv", report.sales_per_platform.ready()),
        export_rows(dir, "category_top_bottom.csv", ranking.map(|r| &r.top_bottom)),
        export_rows(dir, "category_shares.csv", ranking.map(|r| &r.shares)),
        export_rows(dir, "revenue_per_order.csv", report.revenue_per_order.ready()),
        export_rows(dir, "category_contribution.csv", report.contribution.ready()),
    ]
    .into_iter()
    .flatten()
    .collect();

    let summary = RevenueSummary {
        platforms: sel.selected_platforms.iter().map(String::as_str).collect(),
        total_revenue: report.kpi.total_revenue,
        total_revenue_display: format_inr(report.kpi.total_revenue, 0),
        average_order_value: report.kpi.average_order_value,
        total_orders: report.kpi.total_orders,
        files,
        withheld: withheld_notes([
            ("orders_per_platform", report.orders_per_platform.notice().map(|n| n.to_string())),
            ("sales_per_platform", report.sales_per_platform.notice().map(|n| n.to_string())),
            ("category_ranking", report.category_ranking.notice().map(|n| n.to_string())),
            ("revenue_per_order", report.revenue_per_order.notice().map(|n| n.to_string())),
            ("contribution", report.contribution.notice().map(|n| n.to_string())),
        ]),
    };
    write_json(&dir.join("revenue_summary.json"), &summary)?;
    info!(dir = %dir.display(), files = summary.files.len(), "revenue page exported");
    Ok(())
}

#[derive(Serialize)]
struct ReviewSummary<'a> {
    platforms: Vec<&'a str>,
    locations: Vec<&'a str>,
    snapshot: Option<&'a ReviewSnapshot>,
    platform_usage: Option<&'a PlatformUsageReport>,
    files: Vec<String>,
    withheld: BTreeMap<&'static str, String>,
}

pub fn export_review(dir: &Path, report: &ReviewReport, sel: &FilterSelection) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let feedback = report.feedback.ready();
    let files: Vec<String> = [
        export_rows(dir, "delivery_time_per_platform.csv", report.delivery_times.ready()),
        export_rows(dir, "customer_feedback.csv", feedback.map(|m| &m.cells)),
        export_rows(dir, "accuracy_availability.csv", report.quality.ready()),
    ]
    .into_iter()
    .flatten()
    .collect();

    let summary = ReviewSummary {
        platforms: sel.selected_platforms.iter().map(String::as_str).collect(),
        locations: sel.selected_locations.iter().map(String::as_str).collect(),
        snapshot: report.snapshot.ready(),
        platform_usage: report.platform_usage.ready(),
        files,
        withheld: withheld_notes([
            ("snapshot", report.snapshot.notice().map(|n| n.to_string())),
            ("delivery_times", report.delivery_times.notice().map(|n| n.to_string())),
            ("platform_usage", report.platform_usage.notice().map(|n| n.to_string())),
            ("feedback", report.feedback.notice().map(|n| n.to_string())),
            ("quality", report.quality.notice().map(|n| n.to_string())),
        ]),
    };
    write_json(&dir.join("review_summary.json"), &summary)?;
    info!(dir = %dir.display(), files = summary.files.len(), "review page exported");
    Ok(())
}

/// One-line KPI digest used after an export, e.g. `₹600 across 3 orders (avg 200.00)`.
pub fn kpi_digest(report: &RevenueReport) -> String {
    format!(
        "{} across {} orders (avg {})",
        format_inr(report.kpi.total_revenue, 0),
        format_int(report.kpi.total_orders),
        format_number(report.kpi.average_order_value, 2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dataset, OrderRecord, ReviewRecord};
    use crate::{review, revenue};
    use std::fs;

    fn orders() -> crate::types::OrdersDataset {
        let row = |id: &str, platform: &str, value: f64, category: &str| OrderRecord {
            order_id: id.into(),
            platform: platform.into(),
            location: "Delhi".into(),
            product_category: category.into(),
            order_value: value,
            order_date: None,
        };
        Dataset::complete(vec![
            row("A1", "X", 100.0, "Food"),
            row("A2", "X", 300.0, "Food"),
            row("A3", "X", 200.0, "Drinks"),
        ])
    }

    #[test]
    fn revenue_export_writes_tables_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sel = FilterSelection::default();
        let report = revenue::analyze(&orders(), &sel);
        export_revenue(dir.path(), &report, &sel).unwrap();

        let contribution = fs::read_to_string(dir.path().join("category_contribution.csv")).unwrap();
        let mut lines = contribution.lines();
        assert_eq!(
            lines.next(),
            Some("Platform,Product Category,Category Sales (INR),Contribution (%)")
        );
        assert_eq!(lines.next(), Some("X,Food,400.0,66.7"));

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("revenue_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["total_orders"], 3);
        assert_eq!(summary["total_revenue_display"], "₹600");
        assert_eq!(summary["files"].as_array().unwrap().len(), 6);
        assert!(summary["withheld"].as_object().unwrap().is_empty());
        assert_eq!(kpi_digest(&report), "₹600 across 3 orders (avg 200.00)");
    }

    #[test]
    fn review_export_records_withheld_sections() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::complete(vec![ReviewRecord {
            agent_name: "Swiggy".into(),
            location: "Delhi".into(),
            customer_service_rating: 4.0,
            delivery_time_minutes: 25.5,
            order_accuracy: 1.0,
            product_availability: 0.5,
        }]);
        let sel = FilterSelection::new(["Swiggy", "Blinkit"], ["Delhi"]);
        let report = review::analyze(&ds, &sel);
        export_review(dir.path(), &report, &sel).unwrap();

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("review_summary.json")).unwrap(),
        )
        .unwrap();
        assert!(summary["snapshot"].is_null());
        assert_eq!(
            summary["withheld"]["snapshot"],
            "select a single agent to view key metrics"
        );
        assert_eq!(summary["platform_usage"]["regime"], "single_location_distribution");
        assert!(dir.path().join("customer_feedback.csv").exists());
    }

    #[test]
    fn feedback_table_renders_blank_gaps() {
        let m = FeedbackMatrix {
            locations: vec!["Delhi".into()],
            platforms: vec!["Blinkit".into(), "Swiggy".into()],
            cells: vec![crate::types::FeedbackCell {
                location: "Delhi".into(),
                agent: "Swiggy".into(),
                avg_rating: 4.0,
            }],
        };
        let table = feedback_table(&m);
        assert!(table.contains("Location"));
        assert!(table.contains("4.00"));
    }
}
