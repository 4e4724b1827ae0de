// Trend module: bucket historical records into consecutive calendar months.
//
// The window always ends at the month containing `now` (UTC) and is never
// sparse: empty months are reported with zero counts.

use crate::metrics::completion_rate;
use crate::types::{MetricRecord, TrendPoint};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Number of monthly periods in a standard trend series.
pub const TREND_MONTHS: usize = 12;

/// Which dimension of a trend point feeds a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Total,
    Completed,
    CompletionRate,
    #[default]
    Value,
}

impl TrendPoint {
    pub fn metric(&self, metric: TrendMetric) -> f64 {
        match metric {
            TrendMetric::Total => self.total as f64,
            TrendMetric::Completed => self.completed as f64,
            TrendMetric::CompletionRate => self.completion_rate as f64,
            TrendMetric::Value => self.value,
        }
    }
}

fn month_index(year: i32, month: u32) -> i64 {
    year as i64 * 12 + (month as i64 - 1)
}

fn index_of(ts: &DateTime<Utc>) -> i64 {
    month_index(ts.year(), ts.month())
}

fn label_for_index(idx: i64) -> String {
    let year = idx.div_euclid(12);
    let month = idx.rem_euclid(12) + 1;
    format!("{:04}-{:02}", year, month)
}

/// "YYYY-MM" label of the month containing `ts`.
pub fn period_label(ts: &DateTime<Utc>) -> String {
    label_for_index(index_of(ts))
}

/// Parse a "YYYY-MM" label into its month index.
fn parse_label(label: &str) -> Option<i64> {
    let (year, month) = label.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(month_index(year, month))
}

/// Label of the month following `label`, or None if it is not "YYYY-MM".
pub fn next_period(label: &str) -> Option<String> {
    parse_label(label).map(|idx| label_for_index(idx + 1))
}

/// Standard 12-month trend ending at the month containing `now`.
pub fn generate_trend(records: &[MetricRecord], now: DateTime<Utc>) -> Vec<TrendPoint> {
    generate_trend_with(records, now, TREND_MONTHS)
}

/// Trend over `months` consecutive months ending at the month containing `now`,
/// oldest first.
pub fn generate_trend_with(
    records: &[MetricRecord],
    now: DateTime<Utc>,
    months: usize,
) -> Vec<TrendPoint> {
    if months == 0 {
        return Vec::new();
    }

    let end = index_of(&now);
    let start = end - (months as i64 - 1);

    // (total, completed, value) per month
    let mut buckets: Vec<(usize, usize, f64)> = vec![(0, 0, 0.0); months];
    let mut undated = 0usize;
    let mut outside = 0usize;

    for record in records {
        let Some(ts) = record.timestamp.as_ref() else {
            undated += 1;
            continue;
        };
        let idx = index_of(ts);
        if idx < start || idx > end {
            outside += 1;
            continue;
        }
        let bucket = &mut buckets[(idx - start) as usize];
        bucket.0 += 1;
        if record.is_completed() {
            bucket.1 += 1;
        }
        bucket.2 += record.value_or_zero();
    }

    if undated > 0 {
        tracing::warn!(undated, "records without timestamp skipped from trend");
    }
    tracing::debug!(
        months,
        records = records.len(),
        outside,
        "trend generated"
    );

    buckets
        .into_iter()
        .enumerate()
        .map(|(offset, (total, completed, value))| TrendPoint {
            period: label_for_index(start + offset as i64),
            total,
            completed,
            completion_rate: completion_rate(completed, total),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn record(ts: DateTime<Utc>, completed: bool, value: f64) -> MetricRecord {
        MetricRecord {
            subject_id: "s1".to_string(),
            timestamp: Some(ts),
            completed: Some(completed),
            value: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn empty_history_gives_twelve_zero_points() {
        let trend = generate_trend(&[], at(2026, 3, 15));
        assert_eq!(trend.len(), 12);
        assert_eq!(trend[0].period, "2025-04");
        assert_eq!(trend[11].period, "2026-03");
        assert!(trend.iter().all(|p| p.total == 0 && p.completion_rate == 0));
    }

    #[test]
    fn records_land_in_their_month() {
        let now = at(2026, 3, 15);
        let records = vec![
            record(at(2026, 3, 1), true, 100.0),
            record(at(2026, 3, 20), false, 50.0),
            record(at(2026, 1, 5), true, 10.0),
            record(at(2024, 1, 5), true, 999.0),
        ];
        let trend = generate_trend(&records, now);
        let march = &trend[11];
        assert_eq!(march.total, 2);
        assert_eq!(march.completed, 1);
        assert_eq!(march.completion_rate, 50);
        assert_eq!(march.value, 150.0);
        let january = &trend[9];
        assert_eq!(january.period, "2026-01");
        assert_eq!(january.total, 1);
        assert_eq!(january.completion_rate, 100);
        let total: usize = trend.iter().map(|p| p.total).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn undated_records_are_skipped() {
        let mut r = record(at(2026, 3, 1), true, 5.0);
        r.timestamp = None;
        let trend = generate_trend(&[r], at(2026, 3, 15));
        assert!(trend.iter().all(|p| p.total == 0));
    }

    #[test]
    fn periods_cross_year_boundary() {
        let trend = generate_trend(&[], at(2026, 1, 31));
        assert_eq!(trend[0].period, "2025-02");
        assert_eq!(trend[10].period, "2025-12");
        assert_eq!(trend[11].period, "2026-01");
    }

    #[test]
    fn custom_window_lengths() {
        assert!(generate_trend_with(&[], at(2026, 1, 1), 0).is_empty());
        let trend = generate_trend_with(&[], at(2026, 1, 1), 3);
        let periods: Vec<_> = trend.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2025-11", "2025-12", "2026-01"]);
    }

    #[test]
    fn next_period_rolls_over() {
        assert_eq!(next_period("2025-12").as_deref(), Some("2026-01"));
        assert_eq!(next_period("2026-04").as_deref(), Some("2026-05"));
        assert_eq!(next_period("2026-13"), None);
        assert_eq!(next_period("garbage"), None);
    }

    #[test]
    fn metric_selects_dimension() {
        let p = TrendPoint {
            period: "2026-01".to_string(),
            total: 4,
            completed: 3,
            completion_rate: 75,
            value: 12.5,
        };
        assert_eq!(p.metric(TrendMetric::Total), 4.0);
        assert_eq!(p.metric(TrendMetric::Completed), 3.0);
        assert_eq!(p.metric(TrendMetric::CompletionRate), 75.0);
        assert_eq!(p.metric(TrendMetric::Value), 12.5);
    }
}
