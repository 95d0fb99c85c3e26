use crate::error::{DashboardError, Result};
use crate::types::{
    Column, Dataset, OrderColumn, OrderRecord, OrdersDataset, RawOrderRow, RawReviewRow,
    ReviewColumn, ReviewRecord, ReviewsDataset,
};
use crate::util::{clean_text, coerce_or_zero, parse_date_safe};
use csv::{Reader, ReaderBuilder, StringRecord};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub coerced_values: usize,
    pub unparsed_dates: usize,
    pub duplicate_ids: usize,
    pub missing_columns: Vec<&'static str>,
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(DashboardError::DataFileMissing(path.to_path_buf()));
    }
    Ok(File::open(path)?)
}

fn reader<R: io::Read>(rdr: R) -> Reader<R> {
    ReaderBuilder::new().flexible(true).from_reader(rdr)
}

/// Which schema columns the header carries, plus the ones it lacks.
fn present_columns<C: Column>(headers: &StringRecord) -> (BTreeSet<C>, Vec<&'static str>) {
    let present: BTreeSet<C> = headers.iter().filter_map(C::from_header).collect();
    let missing = C::ALL
        .iter()
        .filter(|c| !present.contains(c))
        .map(|c| c.header())
        .collect();
    (present, missing)
}

pub fn load_orders(path: &Path) -> Result<(OrdersDataset, LoadReport)> {
    let (data, report) = orders_from_reader(open(path)?)?;
    log_report("orders", path, &report);
    Ok((data, report))
}

pub fn load_reviews(path: &Path) -> Result<(ReviewsDataset, LoadReport)> {
    let (data, report) = reviews_from_reader(open(path)?)?;
    log_report("reviews", path, &report);
    Ok((data, report))
}

pub fn orders_from_reader<R: io::Read>(rdr: R) -> Result<(OrdersDataset, LoadReport)> {
    read_orders(reader(rdr))
}

pub fn reviews_from_reader<R: io::Read>(rdr: R) -> Result<(ReviewsDataset, LoadReport)> {
    read_reviews(reader(rdr))
}

fn read_orders<R: io::Read>(mut rdr: Reader<R>) -> Result<(OrdersDataset, LoadReport)> {
    let (columns, missing_columns) = present_columns::<OrderColumn>(rdr.headers()?);
    let mut report = LoadReport {
        missing_columns,
        ..LoadReport::default()
    };
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for result in rdr.deserialize::<RawOrderRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(row = report.total_rows, error = %e, "skipping unreadable order row");
                report.parse_errors += 1;
                continue;
            }
        };

        let (order_value, coerced) = coerce_or_zero(row.order_value.as_deref());
        if coerced {
            report.coerced_values += 1;
        }
        let order_date = parse_date_safe(row.order_date.as_deref());
        let has_date_text = row
            .order_date
            .as_deref()
            .map_or(false, |d| !d.trim().is_empty());
        if order_date.is_none() && has_date_text {
            report.unparsed_dates += 1;
        }

        let order_id = clean_text(row.order_id);
        if !order_id.is_empty() && !seen_ids.insert(order_id.clone()) {
            report.duplicate_ids += 1;
        }

        records.push(OrderRecord {
            order_id,
            platform: clean_text(row.platform),
            location: clean_text(row.location),
            product_category: clean_text(row.product_category),
            order_value,
            order_date,
        });
    }

    report.loaded_rows = records.len();
    if report.duplicate_ids > 0 {
        warn!(
            duplicates = report.duplicate_ids,
            "order ids are not unique; order totals count distinct ids"
        );
    }
    Ok((Dataset { records, columns }, report))
}

fn read_reviews<R: io::Read>(mut rdr: Reader<R>) -> Result<(ReviewsDataset, LoadReport)> {
    let (columns, missing_columns) = present_columns::<ReviewColumn>(rdr.headers()?);
    let mut report = LoadReport {
        missing_columns,
        ..LoadReport::default()
    };
    let mut records = Vec::new();

    for result in rdr.deserialize::<RawReviewRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(row = report.total_rows, error = %e, "skipping unreadable review row");
                report.parse_errors += 1;
                continue;
            }
        };

        let mut coerce = |cell: Option<String>| {
            let (v, coerced) = coerce_or_zero(cell.as_deref());
            if coerced {
                report.coerced_values += 1;
            }
            v
        };
        let customer_service_rating = coerce(row.customer_service_rating);
        let delivery_time_minutes = coerce(row.delivery_time);
        let order_accuracy = coerce(row.order_accuracy);
        let product_availability = coerce(row.product_availability);

        records.push(ReviewRecord {
            agent_name: clean_text(row.agent_name),
            location: clean_text(row.location),
            customer_service_rating,
            delivery_time_minutes,
            order_accuracy,
            product_availability,
        });
    }

    report.loaded_rows = records.len();
    Ok((Dataset { records, columns }, report))
}

fn log_report(kind: &str, path: &Path, report: &LoadReport) {
    info!(
        dataset = kind,
        path = %path.display(),
        rows = report.loaded_rows,
        skipped = report.parse_errors,
        coerced = report.coerced_values,
        "dataset loaded"
    );
    if !report.missing_columns.is_empty() {
        warn!(
            dataset = kind,
            missing = ?report.missing_columns,
            "columns missing; dependent sections will be skipped"
        );
    }
}
