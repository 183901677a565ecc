use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::delivery::DeliveryRecord;

/// Utilisation below this percentage flags a delivery for attention
pub const LOW_UTILISATION_THRESHOLD: f64 = 50.0;

/// Values the filter controls can offer, taken from the loaded records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    /// Distinct regions in order of first appearance
    pub regions: Vec<String>,
    /// Distinct statuses in order of first appearance
    pub statuses: Vec<String>,
    /// Distinct week ranges, sorted
    pub week_ranges: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[DeliveryRecord]) -> Self {
        let mut regions: Vec<String> = Vec::new();
        let mut statuses: Vec<String> = Vec::new();
        let mut week_ranges = BTreeSet::new();

        for record in records {
            if !regions.contains(&record.region) {
                regions.push(record.region.clone());
            }
            if !statuses.contains(&record.status) {
                statuses.push(record.status.clone());
            }
            week_ranges.insert(record.week_range.clone());
        }

        Self {
            regions,
            statuses,
            week_ranges: week_ranges.into_iter().collect(),
        }
    }

    /// First region, every status and first week range.
    ///
    /// With nothing loaded the region and week are empty and match no rows.
    pub fn default_selection(&self) -> FilterSelection {
        FilterSelection {
            region: self.regions.first().cloned().unwrap_or_default(),
            statuses: self.statuses.iter().cloned().collect(),
            week_range: self.week_ranges.first().cloned().unwrap_or_default(),
        }
    }
}

/// The three predicates a dashboard view is filtered by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub region: String,
    pub statuses: BTreeSet<String>,
    pub week_range: String,
}

impl FilterSelection {
    pub fn matches(&self, record: &DeliveryRecord) -> bool {
        record.region == self.region
            && self.statuses.contains(&record.status)
            && record.week_range == self.week_range
    }

    /// Records satisfying all three predicates, in load order.
    pub fn apply<'a>(&self, records: &'a [DeliveryRecord]) -> Vec<&'a DeliveryRecord> {
        let filtered: Vec<&DeliveryRecord> = records.iter().filter(|r| self.matches(r)).collect();
        tracing::debug!(
            "Filter region={} week={} statuses={} kept {} of {} deliveries",
            self.region,
            self.week_range,
            self.statuses.len(),
            filtered.len(),
            records.len()
        );
        filtered
    }
}

/// Filter parameters as they arrive from a request.
///
/// `applied` is set by the dashboard form. It tells an explicitly empty status
/// selection apart from a first visit where no status was chosen yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    pub region: Option<String>,
    pub week_range: Option<String>,
    pub statuses: Vec<String>,
    pub applied: bool,
}

impl FilterQuery {
    /// Build a query from decoded `key=value` pairs. Unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "region" => query.region = Some(value),
                "week" => query.week_range = Some(value),
                "status" => query.statuses.push(value),
                "applied" => query.applied = true,
                _ => {}
            }
        }
        query
    }

    /// Fill in defaults for missing parameters.
    ///
    /// Every explicit value must be one the options offer.
    pub fn resolve(&self, options: &FilterOptions) -> Result<FilterSelection, FilterError> {
        check("region", self.region.as_deref(), &options.regions)?;
        check("week", self.week_range.as_deref(), &options.week_ranges)?;
        for status in &self.statuses {
            check("status", Some(status), &options.statuses)?;
        }

        let defaults = options.default_selection();
        let statuses = if self.statuses.is_empty() && !self.applied {
            defaults.statuses
        } else {
            self.statuses.iter().cloned().collect()
        };

        Ok(FilterSelection {
            region: self.region.clone().unwrap_or(defaults.region),
            statuses,
            week_range: self.week_range.clone().unwrap_or(defaults.week_range),
        })
    }

    /// Encode back into a query string, for links that keep the selection.
    pub fn encode(selection: &FilterSelection) -> String {
        let mut pairs: Vec<(&str, &str)> = vec![
            ("region", selection.region.as_str()),
            ("week", selection.week_range.as_str()),
        ];
        pairs.extend(selection.statuses.iter().map(|s| ("status", s.as_str())));
        pairs.push(("applied", "1"));
        serde_urlencoded::to_string(pairs).unwrap_or_default()
    }
}

// With nothing loaded the empty-string default is the only accepted value
fn check(key: &'static str, value: Option<&str>, offered: &[String]) -> Result<(), FilterError> {
    match value {
        Some("") if offered.is_empty() => Ok(()),
        Some(v) if !offered.iter().any(|o| o == v) => Err(FilterError::Unknown {
            key,
            value: v.to_string(),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Unknown {key} value: {value:?}")]
    Unknown { key: &'static str, value: String },
}

/// Deliveries with low utilisation or that have not been delivered.
pub fn attention_rows<'a>(records: &[&'a DeliveryRecord]) -> Vec<&'a DeliveryRecord> {
    records
        .iter()
        .copied()
        .filter(|r| r.capacity_utilisation < LOW_UTILISATION_THRESHOLD || !r.is_delivered())
        .collect()
}
