// Revenue page: KPIs, platform rollups and category rankings over orders.
use crate::error::{Notice, Section};
use crate::filter::{filter_orders, FilterSelection};
use crate::types::{
    CategoryRanking, CategoryShare, ContributionShare, KpiSummary, OrderColumn, OrderRecord,
    OrdersDataset, PlatformOrders, PlatformRollup, PlatformSales, TopBottom,
};
use crate::util::{average, ratio_or_zero, round_to};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Sales are shown in lakh (1 lakh = 100,000 INR).
const LAKH: f64 = 100_000.0;

const ORDERS_PER_PLATFORM: &[OrderColumn] = &[OrderColumn::Platform, OrderColumn::OrderId];
const SALES_PER_PLATFORM: &[OrderColumn] = &[OrderColumn::Platform, OrderColumn::OrderValue];
const TOP_BOTTOM: &[OrderColumn] = &[
    OrderColumn::Platform,
    OrderColumn::ProductCategory,
    OrderColumn::OrderId,
];
const REVENUE_PER_ORDER: &[OrderColumn] = &[
    OrderColumn::Platform,
    OrderColumn::OrderValue,
    OrderColumn::OrderId,
];
const CONTRIBUTION: &[OrderColumn] = &[
    OrderColumn::Platform,
    OrderColumn::ProductCategory,
    OrderColumn::OrderValue,
];

/// Everything the revenue page shows for one filter selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueReport {
    pub kpi: KpiSummary,
    pub orders_per_platform: Section<Vec<PlatformOrders>>,
    pub sales_per_platform: Section<Vec<PlatformSales>>,
    pub category_ranking: Section<CategoryRanking>,
    pub revenue_per_order: Section<Vec<PlatformRollup>>,
    pub contribution: Section<Vec<ContributionShare>>,
}

pub fn analyze(data: &OrdersDataset, sel: &FilterSelection) -> RevenueReport {
    RevenueReport {
        kpi: kpi_summary(data, sel),
        orders_per_platform: orders_per_platform(data, sel),
        sales_per_platform: sales_per_platform(data, sel),
        category_ranking: category_ranking(data, sel),
        revenue_per_order: revenue_per_order(data, sel),
        contribution: category_contribution(data, sel),
    }
}

/// Filter the orders for a section, or say why the section is withheld.
fn section_rows<'a>(
    data: &'a OrdersDataset,
    sel: &FilterSelection,
    required: &[OrderColumn],
) -> Result<Vec<&'a OrderRecord>, Notice> {
    data.require(required)?;
    let rows = filter_orders(data, sel);
    if rows.is_empty() {
        return Err(Notice::NoData);
    }
    Ok(rows)
}

fn distinct_orders(rows: &[&OrderRecord]) -> usize {
    // Blank ids cannot be matched against each other, so each one counts.
    let mut ids = HashSet::new();
    let mut blank = 0usize;
    for r in rows {
        if r.order_id.is_empty() {
            blank += 1;
        } else {
            ids.insert(r.order_id.as_str());
        }
    }
    ids.len() + blank
}

pub fn kpi_summary(data: &OrdersDataset, sel: &FilterSelection) -> KpiSummary {
    let rows = filter_orders(data, sel);
    let (total_revenue, average_order_value) = if data.has(OrderColumn::OrderValue) {
        let values: Vec<f64> = rows.iter().map(|r| r.order_value).collect();
        (values.iter().sum::<f64>(), average(&values))
    } else {
        (0.0, 0.0)
    };
    let total_orders = if data.has(OrderColumn::OrderId) {
        distinct_orders(&rows)
    } else {
        rows.len()
    };
    debug!(rows = rows.len(), total_orders, "kpi summary");
    KpiSummary {
        total_revenue,
        average_order_value,
        total_orders,
    }
}

/// Per-platform row count and order value sum, keyed by platform name.
/// Rows without a platform take no part in platform groupings.
fn platform_totals(rows: &[&OrderRecord]) -> BTreeMap<String, (usize, f64)> {
    let mut map: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for r in rows.iter().filter(|r| !r.platform.is_empty()) {
        let e = map.entry(r.platform.clone()).or_default();
        e.0 += 1;
        e.1 += r.order_value;
    }
    map
}

fn sort_desc_by<T>(rows: &mut [T], key: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

pub fn orders_per_platform(
    data: &OrdersDataset,
    sel: &FilterSelection,
) -> Section<Vec<PlatformOrders>> {
    let rows = match section_rows(data, sel, ORDERS_PER_PLATFORM) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let mut out: Vec<PlatformOrders> = platform_totals(&rows)
        .into_iter()
        .map(|(platform, (count, _))| PlatformOrders {
            platform,
            total_orders: count,
        })
        .collect();
    out.sort_by(|a, b| b.total_orders.cmp(&a.total_orders));
    Section::Ready(out)
}

pub fn sales_per_platform(
    data: &OrdersDataset,
    sel: &FilterSelection,
) -> Section<Vec<PlatformSales>> {
    let rows = match section_rows(data, sel, SALES_PER_PLATFORM) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let mut out: Vec<PlatformSales> = platform_totals(&rows)
        .into_iter()
        .map(|(platform, (_, sales))| PlatformSales {
            platform,
            total_sales: sales,
            total_sales_lakh: round_to(sales / LAKH, 2),
        })
        .collect();
    sort_desc_by(&mut out, |r| r.total_sales_lakh);
    Section::Ready(out)
}

pub fn revenue_per_order(
    data: &OrdersDataset,
    sel: &FilterSelection,
) -> Section<Vec<PlatformRollup>> {
    let rows = match section_rows(data, sel, REVENUE_PER_ORDER) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let mut out: Vec<PlatformRollup> = platform_totals(&rows)
        .into_iter()
        .map(|(platform, (orders, sales))| PlatformRollup {
            platform,
            total_orders: orders,
            total_sales: sales,
            revenue_per_order: round_to(ratio_or_zero(sales, orders as f64), 2),
        })
        .collect();
    sort_desc_by(&mut out, |r| r.revenue_per_order);
    Section::Ready(out)
}

/// Per platform, its categories with a per-category accumulator. Both levels
/// are keyed by name, so ties downstream resolve to the first name.
fn by_platform_and_category<T: Default>(
    rows: &[&OrderRecord],
    mut add: impl FnMut(&mut T, &OrderRecord),
) -> BTreeMap<String, BTreeMap<String, T>> {
    let mut map: BTreeMap<String, BTreeMap<String, T>> = BTreeMap::new();
    for r in rows
        .iter()
        .filter(|r| !r.platform.is_empty() && !r.product_category.is_empty())
    {
        let acc = map
            .entry(r.platform.clone())
            .or_default()
            .entry(r.product_category.clone())
            .or_default();
        add(acc, *r);
    }
    map
}

pub fn category_ranking(data: &OrdersDataset, sel: &FilterSelection) -> Section<CategoryRanking> {
    let rows = match section_rows(data, sel, TOP_BOTTOM) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let grouped = by_platform_and_category::<usize>(&rows, |n, _| *n += 1);

    let mut shares = Vec::new();
    let mut top_bottom = Vec::new();
    for (platform, cats) in grouped {
        let platform_total: usize = cats.values().sum();
        let start = shares.len();
        for (category, orders) in cats {
            shares.push(CategoryShare {
                platform: platform.clone(),
                category,
                orders,
                platform_total,
                percentage_of_platform: round_to(
                    ratio_or_zero(orders as f64, platform_total as f64) * 100.0,
                    2,
                ),
            });
        }
        let group = &shares[start..];
        // Strict comparisons keep the first category by name on ties.
        let (mut top, mut bottom) = (&group[0], &group[0]);
        for s in group {
            if s.percentage_of_platform > top.percentage_of_platform {
                top = s;
            }
            if s.percentage_of_platform < bottom.percentage_of_platform {
                bottom = s;
            }
        }
        top_bottom.push(TopBottom {
            platform,
            top_category: top.category.clone(),
            top_orders: top.orders,
            top_pct: top.percentage_of_platform,
            bottom_category: bottom.category.clone(),
            bottom_orders: bottom.orders,
            bottom_pct: bottom.percentage_of_platform,
        });
    }
    debug!(platforms = top_bottom.len(), "category ranking");
    Section::Ready(CategoryRanking { top_bottom, shares })
}

pub fn category_contribution(
    data: &OrdersDataset,
    sel: &FilterSelection,
) -> Section<Vec<ContributionShare>> {
    let rows = match section_rows(data, sel, CONTRIBUTION) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let grouped = by_platform_and_category::<f64>(&rows, |sum, r| *sum += r.order_value);

    let mut out = Vec::new();
    for (platform, cats) in grouped {
        let platform_sales: f64 = cats.values().sum();
        let mut rows: Vec<ContributionShare> = cats
            .into_iter()
            .map(|(category, sales)| ContributionShare {
                platform: platform.clone(),
                category,
                category_sales: sales,
                pct_of_platform_sales: round_to(ratio_or_zero(sales, platform_sales) * 100.0, 1),
            })
            .collect();
        sort_desc_by(&mut rows, |r| r.pct_of_platform_sales);
        out.extend(rows);
    }
    Section::Ready(out)
}
