use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::delivery::{DeliveryRecord, date_format};

/// Number of equal-width bins in the vehicle load histogram
pub const LOAD_HISTOGRAM_BINS: usize = 20;

/// Row count for one key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: usize,
}

/// Row count for a (group, series) pair, e.g. branch and status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCount {
    pub group: String,
    pub series: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMean {
    pub key: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    #[serde(with = "date_format")]
    pub at: NaiveDateTime,
    pub count: usize,
}

/// Histogram bin covering `[lower, upper)`; the last bin also includes `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Every aggregate the dashboard shows for one filtered set.
///
/// Means are `None` when there is nothing to average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub deliveries: usize,
    pub total_beneficiaries: i64,
    pub avg_capacity_utilisation: Option<f64>,
    pub avg_return_percentage: Option<f64>,
    pub trips_per_branch: Vec<KeyCount>,
    pub status_per_branch: Vec<PairCount>,
    pub deliveries_over_time: Vec<TimePoint>,
    pub deliveries_by_week: Vec<KeyCount>,
    pub avg_capacity_per_branch: Vec<KeyMean>,
    pub trips_per_vehicle: Vec<KeyCount>,
    pub vehicle_load_distribution: Vec<LoadBin>,
    pub urgency_distribution: Vec<KeyCount>,
    pub cargo_type_by_region: Vec<PairCount>,
    pub cargo_type_by_branch: Vec<PairCount>,
    pub cargo_subtype_by_branch: Vec<PairCount>,
}

impl DashboardSummary {
    pub fn compute(records: &[&DeliveryRecord]) -> Self {
        Self {
            deliveries: records.len(),
            total_beneficiaries: records.iter().map(|r| r.beneficiaries_count).sum(),
            avg_capacity_utilisation: mean(records.iter().map(|r| r.capacity_utilisation)),
            avg_return_percentage: mean(records.iter().map(|r| r.return_percentage)),
            trips_per_branch: count_by(records, |r| &r.branch),
            status_per_branch: count_by_pair(records, |r| (&r.branch, &r.status)),
            deliveries_over_time: deliveries_over_time(records),
            deliveries_by_week: count_by(records, |r| &r.week_range),
            avg_capacity_per_branch: mean_by(records, |r| &r.branch, |r| r.capacity_utilisation),
            trips_per_vehicle: ranked(count_by(records, |r| &r.vehicle)),
            vehicle_load_distribution: histogram(
                records.iter().map(|r| r.vehicle_load_tonnes),
                LOAD_HISTOGRAM_BINS,
            ),
            urgency_distribution: ranked(count_by(records, |r| &r.urgency_level)),
            cargo_type_by_region: count_by_pair(records, |r| (&r.region, &r.cargo_type)),
            cargo_type_by_branch: count_by_pair(records, |r| (&r.branch, &r.cargo_type)),
            cargo_subtype_by_branch: count_by_pair(records, |r| (&r.branch, &r.cargo_subtype)),
        }
    }
}

pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Row counts per key, sorted by key.
pub fn count_by<F>(records: &[&DeliveryRecord], key: F) -> Vec<KeyCount>
where
    F: Fn(&DeliveryRecord) -> &String,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(key(record).as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(key, count)| KeyCount {
            key: key.to_string(),
            count,
        })
        .collect()
}

/// Row counts per (group, series) pair, sorted by group then series.
pub fn count_by_pair<F>(records: &[&DeliveryRecord], key: F) -> Vec<PairCount>
where
    F: Fn(&DeliveryRecord) -> (&String, &String),
{
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for record in records {
        let (group, series) = key(record);
        *counts.entry((group.as_str(), series.as_str())).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|((group, series), count)| PairCount {
            group: group.to_string(),
            series: series.to_string(),
            count,
        })
        .collect()
}

pub fn mean_by<K, V>(records: &[&DeliveryRecord], key: K, value: V) -> Vec<KeyMean>
where
    K: Fn(&DeliveryRecord) -> &String,
    V: Fn(&DeliveryRecord) -> f64,
{
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = sums.entry(key(record).as_str()).or_insert((0.0, 0));
        entry.0 += value(record);
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(key, (sum, n))| KeyMean {
            key: key.to_string(),
            mean: sum / n as f64,
        })
        .collect()
}

/// Largest count first, ties broken by key.
fn ranked(mut counts: Vec<KeyCount>) -> Vec<KeyCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    counts
}

/// Deliveries per arrival date, oldest first.
pub fn deliveries_over_time(records: &[&DeliveryRecord]) -> Vec<TimePoint> {
    let mut counts: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.arrival_date).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(at, count)| TimePoint { at, count })
        .collect()
}

/// Equal-width histogram over the observed range of `values`.
pub fn histogram(values: impl Iterator<Item = f64>, bins: usize) -> Vec<LoadBin> {
    let values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    // a single observed value still gets a visible bin
    let width = if span > 0.0 { span / bins as f64 } else { 1.0 };

    let mut result: Vec<LoadBin> = (0..bins)
        .map(|i| LoadBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();

    for value in values {
        let index = (((value - min) / width).floor() as usize).min(bins - 1);
        result[index].count += 1;
    }

    result
}
