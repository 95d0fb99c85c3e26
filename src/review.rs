// Review page: single-agent snapshot, delivery times, platform usage,
// feedback cross-tab and accuracy/availability rollup.
use crate::error::{Notice, Section};
use crate::filter::{filter_reviews, review_platform_options, FilterSelection};
use crate::types::{
    AgentDeliveryTime, DeliveryTime, FeedbackCell, FeedbackMatrix, LocationWinner,
    PlatformUsage, PlatformUsageReport, QualityMetric, QualityMetricRow, ReviewColumn,
    ReviewRecord, ReviewSnapshot, ReviewsDataset, UsageRegime,
};
use crate::util::{average, ratio_or_zero};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const SNAPSHOT: &[ReviewColumn] = &[
    ReviewColumn::AgentName,
    ReviewColumn::CustomerServiceRating,
    ReviewColumn::DeliveryTime,
    ReviewColumn::OrderAccuracy,
    ReviewColumn::ProductAvailability,
];
const DELIVERY: &[ReviewColumn] = &[
    ReviewColumn::AgentName,
    ReviewColumn::Location,
    ReviewColumn::DeliveryTime,
];
const USAGE: &[ReviewColumn] = &[ReviewColumn::AgentName, ReviewColumn::Location];
const FEEDBACK: &[ReviewColumn] = &[
    ReviewColumn::AgentName,
    ReviewColumn::Location,
    ReviewColumn::CustomerServiceRating,
];
const QUALITY: &[ReviewColumn] = &[
    ReviewColumn::AgentName,
    ReviewColumn::Location,
    ReviewColumn::OrderAccuracy,
    ReviewColumn::ProductAvailability,
];

/// Everything the review page shows for one filter selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReport {
    pub snapshot: Section<ReviewSnapshot>,
    pub delivery_times: Section<Vec<AgentDeliveryTime>>,
    pub platform_usage: Section<PlatformUsageReport>,
    pub feedback: Section<FeedbackMatrix>,
    pub quality: Section<Vec<QualityMetricRow>>,
}

pub fn analyze(data: &ReviewsDataset, sel: &FilterSelection) -> ReviewReport {
    ReviewReport {
        snapshot: review_snapshot(data, sel),
        delivery_times: delivery_time_per_platform(data, sel),
        platform_usage: platform_usage(data, sel),
        feedback: feedback_matrix(data, sel),
        quality: quality_metrics(data, sel),
    }
}

fn section_rows<'a>(
    data: &'a ReviewsDataset,
    sel: &FilterSelection,
    required: &[ReviewColumn],
) -> Result<Vec<&'a ReviewRecord>, Notice> {
    data.require(required)?;
    let rows = filter_reviews(data, sel);
    if rows.is_empty() {
        return Err(Notice::NoData);
    }
    Ok(rows)
}

fn mean_of(rows: &[&ReviewRecord], field: impl Fn(&ReviewRecord) -> f64) -> f64 {
    let values: Vec<f64> = rows.iter().map(|r| field(*r)).collect();
    average(&values)
}

/// KPIs for the one selected agent, over all of its reviews regardless of
/// the location filter.
pub fn review_snapshot(data: &ReviewsDataset, sel: &FilterSelection) -> Section<ReviewSnapshot> {
    let Some(agent) = sel.single_platform() else {
        return Section::Withheld(Notice::SingleAgentRequired);
    };
    if let Err(n) = data.require(SNAPSHOT) {
        return Section::Withheld(n);
    }
    let rows: Vec<&ReviewRecord> = data
        .records
        .iter()
        .filter(|r| r.agent_name == agent)
        .collect();
    if rows.is_empty() {
        return Section::Withheld(Notice::NoData);
    }
    debug!(agent, reviews = rows.len(), "review snapshot");
    Section::Ready(ReviewSnapshot {
        agent: agent.to_string(),
        delivery_time: DeliveryTime::from_mean(mean_of(&rows, |r| r.delivery_time_minutes)),
        avg_rating: mean_of(&rows, |r| r.customer_service_rating),
        order_accuracy_pct: mean_of(&rows, |r| r.order_accuracy) * 100.0,
        product_availability_pct: mean_of(&rows, |r| r.product_availability) * 100.0,
    })
}

fn group_by_agent<'a>(rows: &[&'a ReviewRecord]) -> BTreeMap<&'a str, Vec<&'a ReviewRecord>> {
    let mut map: BTreeMap<&str, Vec<&ReviewRecord>> = BTreeMap::new();
    for r in rows {
        map.entry(r.agent_name.as_str()).or_default().push(*r);
    }
    map
}

pub fn delivery_time_per_platform(
    data: &ReviewsDataset,
    sel: &FilterSelection,
) -> Section<Vec<AgentDeliveryTime>> {
    let rows = match section_rows(data, sel, DELIVERY) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let out = group_by_agent(&rows)
        .into_iter()
        .map(|(agent, group)| {
            let time = DeliveryTime::from_mean(mean_of(&group, |r| r.delivery_time_minutes));
            AgentDeliveryTime {
                agent: agent.to_string(),
                avg_delivery_minutes: time.mean_minutes,
                formatted: time.to_string(),
            }
        })
        .collect();
    Section::Ready(out)
}

/// Pick the usage report for a selection. `known_platforms` are all the
/// platforms the reviews dataset carries.
pub fn usage_regime(sel: &FilterSelection, known_platforms: &[String]) -> UsageRegime {
    let all_selected = !known_platforms.is_empty()
        && known_platforms
            .iter()
            .all(|p| sel.selected_platforms.contains(p));
    if !all_selected {
        UsageRegime::Withheld
    } else if sel.selected_locations.len() > 1 {
        UsageRegime::WinnerPerLocation
    } else {
        UsageRegime::SingleLocationDistribution
    }
}

/// Count rows per agent, keeping agents in first-seen order.
fn agent_counts<'a>(rows: impl Iterator<Item = &'a ReviewRecord>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for r in rows {
        match counts.iter_mut().find(|(a, _)| *a == r.agent_name) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.agent_name.as_str(), 1)),
        }
    }
    counts
}

pub fn platform_usage(
    data: &ReviewsDataset,
    sel: &FilterSelection,
) -> Section<PlatformUsageReport> {
    let rows = match section_rows(data, sel, USAGE) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let known = review_platform_options(data);
    let regime = usage_regime(sel, &known);
    debug!(?regime, "platform usage");

    match regime {
        UsageRegime::Withheld => Section::Withheld(Notice::AllPlatformsRequired(known.len())),
        UsageRegime::WinnerPerLocation => {
            let mut by_location: BTreeMap<&str, Vec<&ReviewRecord>> = BTreeMap::new();
            for r in &rows {
                by_location.entry(r.location.as_str()).or_default().push(*r);
            }
            let winners = by_location
                .into_iter()
                .filter_map(|(location, group)| {
                    // Strict comparison keeps the first-seen platform on ties.
                    let counts = agent_counts(group.into_iter());
                    let mut best = counts.first().copied()?;
                    for c in &counts {
                        if c.1 > best.1 {
                            best = *c;
                        }
                    }
                    Some(LocationWinner {
                        location: location.to_string(),
                        platform: best.0.to_string(),
                        reviews: best.1,
                    })
                })
                .collect();
            Section::Ready(PlatformUsageReport::WinnerPerLocation { winners })
        }
        UsageRegime::SingleLocationDistribution => {
            let Some(location) = sel.selected_locations.iter().next() else {
                return Section::Withheld(Notice::NoData);
            };
            let mut counts = agent_counts(rows.iter().copied().filter(|r| &r.location == location));
            counts.sort_by(|a, b| b.1.cmp(&a.1));
            let total: usize = counts.iter().map(|(_, n)| n).sum();
            let usage = counts
                .into_iter()
                .map(|(platform, count)| PlatformUsage {
                    platform: platform.to_string(),
                    count,
                    percentage: ratio_or_zero(count as f64, total as f64) * 100.0,
                })
                .collect();
            Section::Ready(PlatformUsageReport::SingleLocationDistribution {
                location: location.clone(),
                usage,
            })
        }
    }
}

pub fn feedback_matrix(data: &ReviewsDataset, sel: &FilterSelection) -> Section<FeedbackMatrix> {
    let rows = match section_rows(data, sel, FEEDBACK) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let mut cells: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    let mut platforms: BTreeSet<&str> = BTreeSet::new();
    for r in &rows {
        platforms.insert(r.agent_name.as_str());
        cells
            .entry((r.location.as_str(), r.agent_name.as_str()))
            .or_default()
            .push(r.customer_service_rating);
    }
    let locations: BTreeSet<&str> = cells.keys().map(|(loc, _)| *loc).collect();
    Section::Ready(FeedbackMatrix {
        locations: locations.into_iter().map(str::to_string).collect(),
        platforms: platforms.into_iter().map(str::to_string).collect(),
        cells: cells
            .into_iter()
            .map(|((location, agent), ratings)| FeedbackCell {
                location: location.to_string(),
                agent: agent.to_string(),
                avg_rating: average(&ratings),
            })
            .collect(),
    })
}

/// Mean accuracy and availability per agent as percentages, accuracy rows
/// first.
pub fn quality_metrics(
    data: &ReviewsDataset,
    sel: &FilterSelection,
) -> Section<Vec<QualityMetricRow>> {
    let rows = match section_rows(data, sel, QUALITY) {
        Ok(rows) => rows,
        Err(n) => return Section::Withheld(n),
    };
    let per_agent: Vec<(&str, f64, f64)> = group_by_agent(&rows)
        .into_iter()
        .map(|(agent, group)| {
            (
                agent,
                mean_of(&group, |r| r.order_accuracy) * 100.0,
                mean_of(&group, |r| r.product_availability) * 100.0,
            )
        })
        .collect();

    let accuracy = per_agent.iter().map(|(agent, acc, _)| QualityMetricRow {
        agent: agent.to_string(),
        metric: QualityMetric::OrderAccuracy,
        percentage: *acc,
    });
    let availability = per_agent.iter().map(|(agent, _, avail)| QualityMetricRow {
        agent: agent.to_string(),
        metric: QualityMetric::ProductAvailability,
        percentage: *avail,
    });
    Section::Ready(accuracy.chain(availability).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dataset;

    fn review(agent: &str, location: &str, minutes: f64, rating: f64) -> ReviewRecord {
        ReviewRecord {
            agent_name: agent.into(),
            location: location.into(),
            customer_service_rating: rating,
            delivery_time_minutes: minutes,
            order_accuracy: 0.9,
            product_availability: 0.8,
        }
    }

    fn repeat(agent: &str, location: &str, n: usize) -> Vec<ReviewRecord> {
        (0..n).map(|_| review(agent, location, 20.0, 4.0)).collect()
    }

    fn usage_fixture() -> ReviewsDataset {
        let mut rows = Vec::new();
        rows.extend(repeat("Z", "L1", 1));
        rows.extend(repeat("Y", "L1", 3));
        rows.extend(repeat("X", "L1", 5));
        rows.extend(repeat("Y", "L2", 2));
        rows.extend(repeat("X", "L2", 2));
        Dataset::complete(rows)
    }

    #[test]
    fn snapshot_for_single_agent_formats_mean_time() {
        let ds = Dataset::complete(vec![
            review("Y", "Delhi", 30.5, 4.0),
            review("Y", "Pune", 31.5, 3.0),
            review("X", "Delhi", 10.0, 5.0),
        ]);
        // The location filter does not narrow the snapshot.
        let sel = FilterSelection::new(["Y"], ["Delhi"]);
        let snap = review_snapshot(&ds, &sel);
        let snap = snap.ready().unwrap();
        assert_eq!(snap.delivery_time.to_string(), "31 min 0 sec");
        assert_eq!(snap.avg_rating, 3.5);
        assert!((snap.order_accuracy_pct - 90.0).abs() < 1e-9);
        assert!((snap.product_availability_pct - 80.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_needs_exactly_one_agent() {
        let ds = Dataset::complete(vec![review("Y", "Delhi", 30.0, 4.0)]);
        let sel = FilterSelection::new(["X", "Y"], ["Delhi"]);
        assert_eq!(
            review_snapshot(&ds, &sel),
            Section::Withheld(Notice::SingleAgentRequired)
        );
        let sel = FilterSelection::new(["Q"], ["Delhi"]);
        assert_eq!(review_snapshot(&ds, &sel), Section::Withheld(Notice::NoData));
    }

    #[test]
    fn delivery_times_per_agent() {
        let ds = Dataset::complete(vec![
            review("Swiggy", "Delhi", 30.0, 4.0),
            review("Blinkit", "Delhi", 12.25, 4.0),
            review("Swiggy", "Delhi", 31.0, 4.0),
            review("Swiggy", "Pune", 90.0, 4.0),
        ]);
        let sel = FilterSelection::new(["Swiggy", "Blinkit"], ["Delhi"]);
        let times = delivery_time_per_platform(&ds, &sel);
        let times = times.ready().unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0].agent, "Blinkit");
        assert_eq!(times[0].formatted, "12 min 15 sec");
        assert_eq!(times[1].formatted, "30 min 30 sec");
    }

    #[test]
    fn regime_follows_selection_shape() {
        let known = vec!["X".to_string(), "Y".to_string(), "Z".to_string()];
        let partial = FilterSelection::new(["X", "Y"], ["L1", "L2"]);
        assert_eq!(usage_regime(&partial, &known), UsageRegime::Withheld);
        let many = FilterSelection::new(["X", "Y", "Z"], ["L1", "L2"]);
        assert_eq!(usage_regime(&many, &known), UsageRegime::WinnerPerLocation);
        let one = FilterSelection::new(["X", "Y", "Z"], ["L1"]);
        assert_eq!(
            usage_regime(&one, &known),
            UsageRegime::SingleLocationDistribution
        );
    }

    #[test]
    fn winner_per_location() {
        let ds = usage_fixture();
        let sel = FilterSelection::new(["X", "Y", "Z"], ["L1", "L2"]);
        match platform_usage(&ds, &sel) {
            Section::Ready(PlatformUsageReport::WinnerPerLocation { winners }) => {
                assert_eq!(winners.len(), 2);
                assert_eq!((winners[0].location.as_str(), winners[0].platform.as_str()), ("L1", "X"));
                assert_eq!(winners[0].reviews, 5);
                // L2 is a tie; Y appears first.
                assert_eq!(winners[1].platform, "Y");
            }
            other => panic!("unexpected usage report: {:?}", other),
        }
    }

    #[test]
    fn single_location_distribution() {
        let ds = usage_fixture();
        let sel = FilterSelection::new(["X", "Y", "Z"], ["L1"]);
        match platform_usage(&ds, &sel) {
            Section::Ready(PlatformUsageReport::SingleLocationDistribution { location, usage }) => {
                assert_eq!(location, "L1");
                let names: Vec<&str> = usage.iter().map(|u| u.platform.as_str()).collect();
                assert_eq!(names, vec!["X", "Y", "Z"]);
                let total: f64 = usage.iter().map(|u| u.percentage).sum();
                assert!((total - 100.0).abs() < 1e-9);
                assert!((usage[0].percentage - 500.0 / 9.0).abs() < 1e-9);
            }
            other => panic!("unexpected usage report: {:?}", other),
        }
    }

    #[test]
    fn usage_withheld_without_all_platforms() {
        let ds = usage_fixture();
        let sel = FilterSelection::new(["X", "Y"], ["L1", "L2"]);
        assert_eq!(
            platform_usage(&ds, &sel),
            Section::Withheld(Notice::AllPlatformsRequired(3))
        );
        let nothing = FilterSelection::new(["X", "Y", "Z"], Vec::<String>::new());
        assert_eq!(platform_usage(&ds, &nothing), Section::Withheld(Notice::NoData));
    }

    #[test]
    fn feedback_matrix_has_no_synthetic_cells() {
        let ds = Dataset::complete(vec![
            review("Swiggy", "Delhi", 20.0, 4.0),
            review("Swiggy", "Delhi", 20.0, 3.0),
            review("Blinkit", "Pune", 20.0, 5.0),
        ]);
        let sel = FilterSelection::new(["Swiggy", "Blinkit"], ["Delhi", "Pune"]);
        let m = feedback_matrix(&ds, &sel);
        let m = m.ready().unwrap();
        assert_eq!(m.locations, vec!["Delhi", "Pune"]);
        assert_eq!(m.platforms, vec!["Blinkit", "Swiggy"]);
        assert_eq!(m.get("Delhi", "Swiggy"), Some(3.5));
        assert_eq!(m.get("Delhi", "Blinkit"), None);
        assert_eq!(m.cells.len(), 2);
    }

    #[test]
    fn quality_metrics_in_long_form() {
        let mut slow = review("Swiggy", "Delhi", 20.0, 4.0);
        slow.order_accuracy = 0.5;
        slow.product_availability = 1.0;
        let ds = Dataset::complete(vec![review("Blinkit", "Delhi", 20.0, 4.0), slow]);
        let sel = FilterSelection::new(["Swiggy", "Blinkit"], ["Delhi"]);
        let rows = quality_metrics(&ds, &sel);
        let rows = rows.ready().unwrap();
        let shape: Vec<(&str, QualityMetric)> =
            rows.iter().map(|r| (r.agent.as_str(), r.metric)).collect();
        assert_eq!(
            shape,
            vec![
                ("Blinkit", QualityMetric::OrderAccuracy),
                ("Swiggy", QualityMetric::OrderAccuracy),
                ("Blinkit", QualityMetric::ProductAvailability),
                ("Swiggy", QualityMetric::ProductAvailability),
            ]
        );
        assert_eq!(rows[1].percentage, 50.0);
        assert_eq!(rows[3].percentage, 100.0);
    }

    #[test]
    fn missing_column_withholds_dependent_sections() {
        let mut ds = usage_fixture();
        ds.columns.remove(&ReviewColumn::CustomerServiceRating);
        let sel = FilterSelection::new(["X", "Y", "Z"], ["L1", "L2"]);
        let report = analyze(&ds, &sel);
        assert!(matches!(
            report.feedback,
            Section::Withheld(Notice::MissingColumns(_))
        ));
        assert!(report.delivery_times.ready().is_some());
        assert!(report.platform_usage.ready().is_some());
        assert_eq!(report, analyze(&ds, &sel));
    }
}
