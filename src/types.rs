use crate::error::Notice;
use crate::util::{format_f64_2, format_optional_rating, format_pct, format_pct_1};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tabled::Tabled;

// ---------------------------------------------------------------------------
// Raw CSV rows. Every cell is optional text; coercion happens in the loader.
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawOrderRow {
    #[serde(rename = "Order ID")]
    pub order_id: Option<String>,
    #[serde(rename = "Platform")]
    pub platform: Option<String>,
    #[serde(rename = "Order Value (INR)")]
    pub order_value: Option<String>,
    #[serde(rename = "Order Date")]
    pub order_date: Option<String>,
    #[serde(rename = "Product Category")]
    pub product_category: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawReviewRow {
    #[serde(rename = "Agent Name")]
    pub agent_name: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Customer Service Rating")]
    pub customer_service_rating: Option<String>,
    #[serde(rename = "Delivery Time (min)")]
    pub delivery_time: Option<String>,
    #[serde(rename = "Order Accuracy")]
    pub order_accuracy: Option<String>,
    #[serde(rename = "Product Availability")]
    pub product_availability: Option<String>,
}

// ---------------------------------------------------------------------------
// Clean records and datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub platform: String,
    pub location: String,
    pub product_category: String,
    pub order_value: f64,
    pub order_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub agent_name: String,
    pub location: String,
    pub customer_service_rating: f64,
    pub delivery_time_minutes: f64,
    pub order_accuracy: f64,
    pub product_availability: f64,
}

/// A column of one of the dataset schemas.
pub trait Column: Copy + Ord + 'static {
    const ALL: &'static [Self];

    fn header(self) -> &'static str;

    fn from_header(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|c| c.header() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderColumn {
    OrderId,
    Platform,
    OrderValue,
    OrderDate,
    ProductCategory,
    Location,
}

impl Column for OrderColumn {
    const ALL: &'static [Self] = &[
        OrderColumn::OrderId,
        OrderColumn::Platform,
        OrderColumn::OrderValue,
        OrderColumn::OrderDate,
        OrderColumn::ProductCategory,
        OrderColumn::Location,
    ];

    fn header(self) -> &'static str {
        match self {
            OrderColumn::OrderId => "Order ID",
            OrderColumn::Platform => "Platform",
            OrderColumn::OrderValue => "Order Value (INR)",
            OrderColumn::OrderDate => "Order Date",
            OrderColumn::ProductCategory => "Product Category",
            OrderColumn::Location => "Location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReviewColumn {
    AgentName,
    Location,
    CustomerServiceRating,
    DeliveryTime,
    OrderAccuracy,
    ProductAvailability,
}

impl Column for ReviewColumn {
    const ALL: &'static [Self] = &[
        ReviewColumn::AgentName,
        ReviewColumn::Location,
        ReviewColumn::CustomerServiceRating,
        ReviewColumn::DeliveryTime,
        ReviewColumn::OrderAccuracy,
        ReviewColumn::ProductAvailability,
    ];

    fn header(self) -> &'static str {
        match self {
            ReviewColumn::AgentName => "Agent Name",
            ReviewColumn::Location => "Location",
            ReviewColumn::CustomerServiceRating => "Customer Service Rating",
            ReviewColumn::DeliveryTime => "Delivery Time (min)",
            ReviewColumn::OrderAccuracy => "Order Accuracy",
            ReviewColumn::ProductAvailability => "Product Availability",
        }
    }
}

/// An immutable, already-coerced table plus the columns its header carried.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<R, C: Column> {
    pub records: Vec<R>,
    pub columns: BTreeSet<C>,
}

pub type OrdersDataset = Dataset<OrderRecord, OrderColumn>;
pub type ReviewsDataset = Dataset<ReviewRecord, ReviewColumn>;

impl<R, C: Column> Dataset<R, C> {
    /// Dataset with every schema column present.
    #[cfg(test)]
    pub fn complete(records: Vec<R>) -> Self {
        Dataset {
            records,
            columns: C::ALL.iter().copied().collect(),
        }
    }

    pub fn has(&self, column: C) -> bool {
        self.columns.contains(&column)
    }

    pub fn has_all(&self, columns: &[C]) -> bool {
        columns.iter().all(|c| self.has(*c))
    }

    /// Check that a section's columns are all present.
    pub fn require(&self, columns: &[C]) -> Result<(), Notice> {
        if self.has_all(columns) {
            return Ok(());
        }
        Err(Notice::MissingColumns(
            columns.iter().map(|c| c.header()).collect(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Revenue page results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub average_order_value: f64,
    pub total_orders: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct PlatformOrders {
    #[serde(rename = "Platform")]
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Total Orders")]
    #[tabled(rename = "Total Orders")]
    pub total_orders: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct PlatformSales {
    #[serde(rename = "Platform")]
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Order Value (INR)")]
    #[tabled(rename = "Order Value (INR)", display_with = "format_f64_2")]
    pub total_sales: f64,
    #[serde(rename = "Total Sales (INR, Lakh)")]
    #[tabled(rename = "Total Sales (INR, Lakh)", display_with = "format_f64_2")]
    pub total_sales_lakh: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct PlatformRollup {
    #[serde(rename = "Platform")]
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Total Orders")]
    #[tabled(rename = "Total Orders")]
    pub total_orders: usize,
    #[serde(rename = "Total Sales (INR)")]
    #[tabled(rename = "Total Sales (INR)", display_with = "format_f64_2")]
    pub total_sales: f64,
    #[serde(rename = "Revenue per Order (INR)")]
    #[tabled(rename = "Revenue per Order (INR)", display_with = "format_f64_2")]
    pub revenue_per_order: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CategoryShare {
    #[serde(rename = "Platform")]
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Product Category")]
    #[tabled(rename = "Product Category")]
    pub category: String,
    #[serde(rename = "Orders")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
    #[serde(rename = "Platform Total")]
    #[tabled(rename = "Platform Total")]
    pub platform_total: usize,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage", display_with = "format_pct")]
    pub percentage_of_platform: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct TopBottom {
    #[serde(rename = "Platform")]
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Top Category")]
    #[tabled(rename = "Top Category")]
    pub top_category: String,
    #[serde(rename = "Top Orders")]
    #[tabled(rename = "Top Orders")]
    pub top_orders: usize,
    #[serde(rename = "Top %")]
    #[tabled(rename = "Top %", display_with = "format_pct")]
    pub top_pct: f64,
    #[serde(rename = "Bottom Category")]
    #[tabled(rename = "Bottom Category")]
    pub bottom_category: String,
    #[serde(rename = "Bottom Orders")]
    #[tabled(rename = "Bottom Orders")]
    pub bottom_orders: usize,
    #[serde(rename = "Bottom %")]
    #[tabled(rename = "Bottom %", display_with = "format_pct")]
    pub bottom_pct: f64,
}

/// Output of the top/bottom ranking: the per-platform picks and the full
/// share table they were picked from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRanking {
    pub top_bottom: Vec<TopBottom>,
    pub shares: Vec<CategoryShare>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ContributionShare {
    #[serde(rename = "Platform")]
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Product Category")]
    #[tabled(rename = "Product Category")]
    pub category: String,
    #[serde(rename = "Category Sales (INR)")]
    #[tabled(rename = "Category Sales (INR)", display_with = "format_f64_2")]
    pub category_sales: f64,
    #[serde(rename = "Contribution (%)")]
    #[tabled(rename = "Contribution (%)", display_with = "format_pct_1")]
    pub pct_of_platform_sales: f64,
}

// ---------------------------------------------------------------------------
// Review page results
// ---------------------------------------------------------------------------

/// A mean delivery time split into whole minutes and rounded seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeliveryTime {
    pub mean_minutes: f64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DeliveryTime {
    pub fn from_mean(mean_minutes: f64) -> Self {
        let mean_minutes = if mean_minutes.is_finite() && mean_minutes > 0.0 {
            mean_minutes
        } else {
            0.0
        };
        let whole = mean_minutes.floor();
        let mut minutes = whole as u64;
        let mut seconds = ((mean_minutes - whole) * 60.0).round() as u64;
        if seconds >= 60 {
            minutes += 1;
            seconds -= 60;
        }
        DeliveryTime {
            mean_minutes,
            minutes,
            seconds,
        }
    }
}

impl fmt::Display for DeliveryTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min {} sec", self.minutes, self.seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSnapshot {
    pub agent: String,
    pub delivery_time: DeliveryTime,
    pub avg_rating: f64,
    pub order_accuracy_pct: f64,
    pub product_availability_pct: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct AgentDeliveryTime {
    #[serde(rename = "Agent Name")]
    #[tabled(rename = "Agent Name")]
    pub agent: String,
    #[serde(rename = "Delivery Time (min)")]
    #[tabled(rename = "Delivery Time (min)", display_with = "format_f64_2")]
    pub avg_delivery_minutes: f64,
    #[serde(rename = "Formatted Time")]
    #[tabled(rename = "Formatted Time")]
    pub formatted: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct LocationWinner {
    #[serde(rename = "Location")]
    #[tabled(rename = "Location")]
    pub location: String,
    #[serde(rename = "Most Used Platform")]
    #[tabled(rename = "Most Used Platform")]
    pub platform: String,
    #[serde(rename = "Reviews")]
    #[tabled(rename = "Reviews")]
    pub reviews: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct PlatformUsage {
    #[serde(rename = "Platform")]
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage", display_with = "format_pct")]
    pub percentage: f64,
}

/// Which platform-usage report the current selection calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageRegime {
    /// Not every known platform is selected.
    Withheld,
    /// All platforms, several locations: one winner per location.
    WinnerPerLocation,
    /// All platforms, one location: the full distribution there.
    SingleLocationDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "regime", rename_all = "snake_case")]
pub enum PlatformUsageReport {
    WinnerPerLocation {
        winners: Vec<LocationWinner>,
    },
    SingleLocationDistribution {
        location: String,
        usage: Vec<PlatformUsage>,
    },
}

/// One populated cell of the location × platform rating matrix.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct FeedbackCell {
    #[serde(rename = "Location")]
    #[tabled(rename = "Location")]
    pub location: String,
    #[serde(rename = "Agent Name")]
    #[tabled(rename = "Agent Name")]
    pub agent: String,
    #[serde(rename = "Customer Service Rating")]
    #[tabled(rename = "Customer Service Rating", display_with = "format_f64_2")]
    pub avg_rating: f64,
}

/// Mean rating per (location, platform). Absent combinations stay absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackMatrix {
    pub locations: Vec<String>,
    pub platforms: Vec<String>,
    pub cells: Vec<FeedbackCell>,
}

impl FeedbackMatrix {
    pub fn get(&self, location: &str, platform: &str) -> Option<f64> {
        self.cells
            .iter()
            .find(|c| c.location == location && c.agent == platform)
            .map(|c| c.avg_rating)
    }

    /// Rows of the matrix, one per location, for tabular display.
    pub fn rows(&self) -> Vec<FeedbackRow> {
        self.locations
            .iter()
            .map(|loc| FeedbackRow {
                location: loc.clone(),
                ratings: self.platforms.iter().map(|p| self.get(loc, p)).collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRow {
    pub location: String,
    pub ratings: Vec<Option<f64>>,
}

impl FeedbackRow {
    pub fn cells(&self) -> Vec<String> {
        std::iter::once(self.location.clone())
            .chain(self.ratings.iter().map(format_optional_rating))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityMetric {
    #[serde(rename = "Order Accuracy")]
    OrderAccuracy,
    #[serde(rename = "Product Availability")]
    ProductAvailability,
}

impl fmt::Display for QualityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityMetric::OrderAccuracy => write!(f, "Order Accuracy"),
            QualityMetric::ProductAvailability => write!(f, "Product Availability"),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct QualityMetricRow {
    #[serde(rename = "Agent Name")]
    #[tabled(rename = "Agent Name")]
    pub agent: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: QualityMetric,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage", display_with = "format_pct")]
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_time_formatting() {
        assert_eq!(DeliveryTime::from_mean(0.0).to_string(), "0 min 0 sec");
        assert_eq!(DeliveryTime::from_mean(31.0).to_string(), "31 min 0 sec");
        assert_eq!(DeliveryTime::from_mean(12.5).to_string(), "12 min 30 sec");
        assert_eq!(DeliveryTime::from_mean(f64::NAN).to_string(), "0 min 0 sec");
    }

    #[test]
    fn delivery_time_carries_full_minute() {
        let t = DeliveryTime::from_mean(30.995);
        assert_eq!((t.minutes, t.seconds), (31, 0));
    }

    #[test]
    fn column_headers_round_trip() {
        for c in OrderColumn::ALL {
            assert_eq!(OrderColumn::from_header(c.header()), Some(*c));
        }
        assert_eq!(
            ReviewColumn::from_header(" Delivery Time (min) "),
            Some(ReviewColumn::DeliveryTime)
        );
        assert_eq!(ReviewColumn::from_header("Rating"), None);
    }

    #[test]
    fn require_lists_every_needed_column() {
        let mut ds: OrdersDataset = Dataset::complete(Vec::new());
        ds.columns.remove(&OrderColumn::OrderId);
        assert!(ds.require(&[OrderColumn::Platform]).is_ok());
        assert_eq!(
            ds.require(&[OrderColumn::Platform, OrderColumn::OrderId]),
            Err(Notice::MissingColumns(vec!["Platform", "Order ID"]))
        );
    }

    #[test]
    fn contribution_preview_shows_one_decimal_percent() {
        let row = ContributionShare {
            platform: "X".into(),
            category: "Food".into(),
            category_sales: 400.0,
            pct_of_platform_sales: 66.7,
        };
        let fields = row.fields();
        assert_eq!(fields[2], "400.00");
        assert_eq!(fields[3], "66.7%");
    }

    #[test]
    fn feedback_matrix_leaves_gaps_empty() {
        let m = FeedbackMatrix {
            locations: vec!["Delhi".into(), "Pune".into()],
            platforms: vec!["Blinkit".into(), "Swiggy".into()],
            cells: vec![FeedbackCell {
                location: "Delhi".into(),
                agent: "Swiggy".into(),
                avg_rating: 4.25,
            }],
        };
        assert_eq!(m.get("Delhi", "Swiggy"), Some(4.25));
        assert_eq!(m.get("Pune", "Swiggy"), None);
        let rows = m.rows();
        assert_eq!(rows[0].cells(), vec!["Delhi", "", "4.25"]);
        assert_eq!(rows[1].ratings, vec![None, None]);
    }
}
