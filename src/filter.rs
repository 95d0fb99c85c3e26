// Filter selection and the per-page filtering policies.
use crate::types::{OrderColumn, OrderRecord, OrdersDataset, ReviewRecord, ReviewsDataset};
use std::collections::BTreeSet;

/// Platforms and locations picked by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub selected_platforms: BTreeSet<String>,
    pub selected_locations: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new<P, L>(platforms: P, locations: L) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        FilterSelection {
            selected_platforms: platforms.into_iter().map(Into::into).collect(),
            selected_locations: locations.into_iter().map(Into::into).collect(),
        }
    }

    /// The single selected platform, if exactly one is selected.
    pub fn single_platform(&self) -> Option<&str> {
        if self.selected_platforms.len() == 1 {
            self.selected_platforms.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Orders page policy: an empty platform selection applies no filter.
    pub fn admits_order(&self, r: &OrderRecord) -> bool {
        self.selected_platforms.is_empty() || self.selected_platforms.contains(&r.platform)
    }

    /// Reviews page policy: both selections are membership tests, so an
    /// empty selection admits nothing.
    pub fn admits_review(&self, r: &ReviewRecord) -> bool {
        self.selected_platforms.contains(&r.agent_name)
            && self.selected_locations.contains(&r.location)
    }
}

/// Without a `Platform` column there is nothing to select on, so the
/// platform selection is ignored.
pub fn filter_orders<'a>(data: &'a OrdersDataset, sel: &FilterSelection) -> Vec<&'a OrderRecord> {
    if !data.has(OrderColumn::Platform) {
        return data.records.iter().collect();
    }
    data.records.iter().filter(|r| sel.admits_order(r)).collect()
}

pub fn filter_reviews<'a>(
    data: &'a ReviewsDataset,
    sel: &FilterSelection,
) -> Vec<&'a ReviewRecord> {
    data.records.iter().filter(|r| sel.admits_review(r)).collect()
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Sorted distinct platforms of the orders dataset.
pub fn order_platform_options(data: &OrdersDataset) -> Vec<String> {
    distinct_sorted(data.records.iter().map(|r| r.platform.as_str()))
}

/// Sorted distinct agents (platforms) of the reviews dataset.
pub fn review_platform_options(data: &ReviewsDataset) -> Vec<String> {
    distinct_sorted(data.records.iter().map(|r| r.agent_name.as_str()))
}

pub fn review_location_options(data: &ReviewsDataset) -> Vec<String> {
    distinct_sorted(data.records.iter().map(|r| r.location.as_str()))
}
