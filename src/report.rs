// Report assembly: aggregate primitives, subject ranking, trend, forecast
// and rule-based recommendations combined into one read-only snapshot.
//
// Assembly performs no I/O and never mutates its inputs. With the same
// records, history and `now` the serialized report is byte-identical.

use crate::error::Result;
use crate::forecast;
use crate::metrics::{average_duration, completion_rate, format_duration, percentage, safe_average};
use crate::scorer::{self, metrics_from, ScoreKind, WeightTable};
use crate::trend::{self, TrendMetric};
use crate::types::{MetricRecord, Report, ReportMetrics, SubjectSummary};
use crate::util::{compute_hash, round_to};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Metric used to rank subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    #[default]
    Score,
    Progress,
}

impl RankMetric {
    fn of(&self, subject: &SubjectSummary) -> f64 {
        match self {
            RankMetric::Score => subject.average_score,
            RankMetric::Progress => subject.average_progress,
        }
    }
}

/// Tunables for report assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Length of the top and struggling lists
    pub top_n: usize,
    /// Subjects whose rank metric is below this are struggling
    pub struggling_threshold: f64,
    pub rank_metric: RankMetric,
    pub include_forecast: bool,
    pub forecast_metric: TrendMetric,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            struggling_threshold: 50.0,
            rank_metric: RankMetric::Score,
            include_forecast: true,
            forecast_metric: TrendMetric::Value,
        }
    }
}

/// One independent unit of report generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub records: Vec<MetricRecord>,
    #[serde(default)]
    pub history: Vec<MetricRecord>,
}

// ── Recommendation rules ──

/// What the recommendation rules can see.
pub struct RuleContext<'a> {
    pub metrics: &'a ReportMetrics,
    pub struggling_count: usize,
}

/// A fixed rule: when `applies` holds, all `recommendations` are emitted.
pub struct RecommendationRule {
    pub name: &'static str,
    pub applies: fn(&RuleContext) -> bool,
    pub recommendations: &'static [&'static str],
}

/// Evaluated in this order; rules are independent and may all fire.
pub static RULES: &[RecommendationRule] = &[
    RecommendationRule {
        name: "low-completion",
        applies: |ctx| ctx.metrics.completion_rate < 70,
        recommendations: &[
            "Break long lessons into shorter modules with clear milestones",
            "Send progress reminders to learners who have not finished the course",
        ],
    },
    RecommendationRule {
        name: "short-sessions",
        applies: |ctx| ctx.metrics.average_session_duration < 30.0,
        recommendations: &[
            "Add interactive exercises to keep sessions engaging for longer",
            "Schedule structured mentor sessions of at least 30 minutes",
        ],
    },
    RecommendationRule {
        name: "high-dropout",
        applies: |ctx| ctx.metrics.dropout_rate > 20.0,
        recommendations: &[
            "Reach out to learners at risk of dropping out with one-on-one mentoring",
            "Review onboarding material to set clearer expectations early",
        ],
    },
    RecommendationRule {
        name: "low-scores",
        applies: |ctx| ctx.metrics.average_score < 60.0,
        recommendations: &[
            "Provide additional practice material before assessments",
            "Offer review sessions covering the lowest-scoring topics",
        ],
    },
    RecommendationRule {
        name: "struggling-learners",
        applies: |ctx| ctx.struggling_count > 0,
        recommendations: &["Pair struggling learners with peer mentors"],
    },
];

/// Recommendations of every rule that fires, in rule-table order.
pub fn recommendations(ctx: &RuleContext) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(ctx))
        .flat_map(|rule| {
            tracing::debug!(rule = rule.name, "recommendation rule fired");
            rule.recommendations.iter().map(|s| s.to_string())
        })
        .collect()
}

// ── Aggregation ──

/// Aggregate primitives over all records. Malformed records count toward
/// totals and contribute 0 to every sum.
pub fn aggregate(records: &[MetricRecord]) -> ReportMetrics {
    let total = records.len();
    let mut completed = 0usize;
    let mut dropped = 0usize;
    let mut score_sum = 0.0;
    let mut progress_sum = 0.0;
    let mut duration_sum = 0.0;
    let mut malformed = 0usize;
    let mut subjects: HashSet<&str> = HashSet::new();

    for record in records {
        if record.is_malformed() {
            malformed += 1;
        }
        if record.is_completed() {
            completed += 1;
        }
        if record.is_dropped() {
            dropped += 1;
        }
        score_sum += record.score_or_zero();
        progress_sum += record.progress_or_zero();
        duration_sum += record.duration_or_zero();
        if !record.subject_id.is_empty() {
            subjects.insert(record.subject_id.as_str());
        }
    }

    if malformed > 0 {
        tracing::warn!(malformed, total, "malformed records counted as zero");
    }

    let average_session_duration = average_duration(duration_sum, total);
    ReportMetrics {
        total_records: total,
        subject_count: subjects.len(),
        completed,
        dropped,
        completion_rate: completion_rate(completed, total),
        dropout_rate: percentage(dropped as f64, total as f64),
        average_score: round_to(safe_average(score_sum, total), 2),
        average_progress: round_to(safe_average(progress_sum, total), 2),
        average_session_duration: round_to(average_session_duration, 2),
        session_duration_display: format_duration(average_session_duration),
        malformed_records: malformed,
    }
}

/// Per-subject summaries in first-appearance order. Records without a
/// subject id are not attributed to any subject.
pub fn summarize_subjects(records: &[MetricRecord]) -> Vec<SubjectSummary> {
    struct Acc<'a> {
        id: &'a str,
        name: Option<&'a str>,
        count: usize,
        completed: usize,
        score_sum: f64,
        progress_sum: f64,
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut accs: Vec<Acc> = Vec::new();

    for record in records {
        if record.subject_id.is_empty() {
            continue;
        }
        let slot = *index.entry(record.subject_id.as_str()).or_insert_with(|| {
            accs.push(Acc {
                id: record.subject_id.as_str(),
                name: None,
                count: 0,
                completed: 0,
                score_sum: 0.0,
                progress_sum: 0.0,
            });
            accs.len() - 1
        });
        let acc = &mut accs[slot];
        acc.count += 1;
        if record.is_completed() {
            acc.completed += 1;
        }
        acc.score_sum += record.score_or_zero();
        acc.progress_sum += record.progress_or_zero();
        if acc.name.is_none() {
            acc.name = record.subject_name.as_deref();
        }
    }

    accs.into_iter()
        .map(|a| SubjectSummary {
            subject_id: a.id.to_string(),
            subject_name: a.name.map(String::from),
            record_count: a.count,
            average_score: round_to(safe_average(a.score_sum, a.count), 2),
            average_progress: round_to(safe_average(a.progress_sum, a.count), 2),
            completion_rate: completion_rate(a.completed, a.count),
        })
        .collect()
}

/// Highest first. Stable: equal values keep input order.
pub fn top_performers(
    subjects: &[SubjectSummary],
    metric: RankMetric,
    n: usize,
) -> Vec<SubjectSummary> {
    let mut ranked: Vec<&SubjectSummary> = subjects.iter().collect();
    ranked.sort_by(|a, b| {
        metric
            .of(b)
            .partial_cmp(&metric.of(a))
            .unwrap_or(Ordering::Equal)
    });
    ranked.into_iter().take(n).cloned().collect()
}

/// Subjects below `threshold`, lowest first. Stable: equal values keep input order.
pub fn struggling(
    subjects: &[SubjectSummary],
    metric: RankMetric,
    threshold: f64,
    n: usize,
) -> Vec<SubjectSummary> {
    let mut ranked: Vec<&SubjectSummary> = subjects
        .iter()
        .filter(|s| metric.of(s) < threshold)
        .collect();
    ranked.sort_by(|a, b| {
        metric
            .of(a)
            .partial_cmp(&metric.of(b))
            .unwrap_or(Ordering::Equal)
    });
    ranked.into_iter().take(n).cloned().collect()
}

/// Report with default options and the default cohort weight table.
pub fn generate_report(
    records: &[MetricRecord],
    history: &[MetricRecord],
    now: DateTime<Utc>,
) -> Report {
    assemble_report(
        None,
        records,
        history,
        now,
        &ReportOptions::default(),
        &ScoreKind::CohortPerformance.default_weights(),
    )
}

/// Assemble a full report from borrowed records and history.
pub fn assemble_report(
    label: Option<&str>,
    records: &[MetricRecord],
    history: &[MetricRecord],
    now: DateTime<Utc>,
    options: &ReportOptions,
    cohort_weights: &WeightTable,
) -> Report {
    let metrics = aggregate(records);
    let subjects = summarize_subjects(records);
    let top = top_performers(&subjects, options.rank_metric, options.top_n);
    let low = struggling(
        &subjects,
        options.rank_metric,
        options.struggling_threshold,
        options.top_n,
    );

    let trend = trend::generate_trend(history, now);
    let forecast = options
        .include_forecast
        .then(|| forecast::forecast(&trend, options.forecast_metric));

    let cohort_metrics = metrics_from(&[
        ("completion_rate", metrics.completion_rate as f64),
        ("average_score", metrics.average_score),
        ("engagement_rate", metrics.average_progress),
        ("retention_rate", retention_rate(&metrics)),
    ]);
    let cohort_score = scorer::score_with_bands(&cohort_metrics, cohort_weights);

    let recommendations = recommendations(&RuleContext {
        metrics: &metrics,
        struggling_count: low.len(),
    });

    tracing::debug!(
        label = label.unwrap_or("-"),
        records = metrics.total_records,
        subjects = metrics.subject_count,
        cohort_score = cohort_score.value,
        recommendations = recommendations.len(),
        "report assembled"
    );

    Report {
        generated_at: now,
        label: label.map(str::to_string),
        metrics,
        cohort_score,
        top_performers: top,
        struggling: low,
        trend,
        forecast,
        recommendations,
    }
}

/// Share of records not dropped. An empty cohort has no retention.
fn retention_rate(metrics: &ReportMetrics) -> f64 {
    if metrics.total_records == 0 {
        return 0.0;
    }
    100.0 - metrics.dropout_rate
}

impl Report {
    /// SHA256 of the report's JSON form. Identical reports share a fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(compute_hash(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Grade;
    use chrono::TimeZone;

    fn rec(subject: &str, score: f64, completed: bool) -> MetricRecord {
        MetricRecord {
            subject_id: subject.to_string(),
            score: Some(score),
            progress: Some(score),
            duration_minutes: Some(45.0),
            completed: Some(completed),
            dropped: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn aggregate_empty_is_all_zero() {
        let m = aggregate(&[]);
        assert_eq!(m.total_records, 0);
        assert_eq!(m.completion_rate, 0);
        assert_eq!(m.dropout_rate, 0.0);
        assert_eq!(m.average_score, 0.0);
        assert_eq!(m.session_duration_display, "0m");
    }

    #[test]
    fn aggregate_counts_and_rates() {
        let mut dropped = rec("c", 20.0, false);
        dropped.dropped = Some(true);
        let records = vec![rec("a", 80.0, true), rec("b", 60.0, true), dropped, rec("a", 90.0, false)];
        let m = aggregate(&records);
        assert_eq!(m.total_records, 4);
        assert_eq!(m.subject_count, 3);
        assert_eq!(m.completed, 2);
        assert_eq!(m.dropped, 1);
        assert_eq!(m.completion_rate, 50);
        assert_eq!(m.dropout_rate, 25.0);
        assert_eq!(m.average_score, 62.5);
        assert_eq!(m.average_session_duration, 45.0);
        assert_eq!(m.session_duration_display, "45m");
    }

    #[test]
    fn malformed_record_contributes_zero() {
        let bad = MetricRecord {
            subject_id: "x".to_string(),
            score: Some(f64::NAN),
            ..Default::default()
        };
        let m = aggregate(&[rec("a", 80.0, true), bad]);
        assert_eq!(m.total_records, 2);
        assert_eq!(m.average_score, 40.0);
        assert_eq!(m.malformed_records, 0);

        let empty = MetricRecord::default();
        let m = aggregate(&[empty]);
        assert_eq!(m.malformed_records, 1);
        assert_eq!(m.subject_count, 0);
    }

    #[test]
    fn subjects_keep_first_appearance_order() {
        let records = vec![rec("b", 50.0, true), rec("a", 70.0, true), rec("b", 70.0, false)];
        let subjects = summarize_subjects(&records);
        assert_eq!(subjects[0].subject_id, "b");
        assert_eq!(subjects[0].record_count, 2);
        assert_eq!(subjects[0].average_score, 60.0);
        assert_eq!(subjects[0].completion_rate, 50);
        assert_eq!(subjects[1].subject_id, "a");
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let records = vec![
            rec("first", 70.0, true),
            rec("second", 90.0, true),
            rec("third", 70.0, true),
        ];
        let subjects = summarize_subjects(&records);
        let top = top_performers(&subjects, RankMetric::Score, 10);
        let ids: Vec<_> = top.iter().map(|s| s.subject_id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first", "third"]);
    }

    #[test]
    fn struggling_filters_and_sorts_ascending() {
        let records = vec![
            rec("a", 45.0, false),
            rec("b", 80.0, true),
            rec("c", 10.0, false),
            rec("d", 45.0, false),
            rec("e", 50.0, false),
        ];
        let subjects = summarize_subjects(&records);
        let low = struggling(&subjects, RankMetric::Score, 50.0, 10);
        let ids: Vec<_> = low.iter().map(|s| s.subject_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "d"]);
    }

    #[test]
    fn lists_are_capped() {
        let records: Vec<MetricRecord> = (0..25)
            .map(|i| rec(&format!("s{:02}", i), i as f64, false))
            .collect();
        let subjects = summarize_subjects(&records);
        assert_eq!(top_performers(&subjects, RankMetric::Score, 10).len(), 10);
        let low = struggling(&subjects, RankMetric::Score, 50.0, 10);
        assert_eq!(low.len(), 10);
        assert_eq!(low[0].subject_id, "s00");
    }

    #[test]
    fn rules_fire_in_table_order() {
        let metrics = ReportMetrics {
            total_records: 10,
            subject_count: 10,
            completed: 5,
            dropped: 3,
            completion_rate: 50,
            dropout_rate: 30.0,
            average_score: 80.0,
            average_progress: 80.0,
            average_session_duration: 45.0,
            session_duration_display: "45m".to_string(),
            malformed_records: 0,
        };
        let recs = recommendations(&RuleContext {
            metrics: &metrics,
            struggling_count: 0,
        });
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0], RULES[0].recommendations[0]);
        assert_eq!(recs[2], RULES[2].recommendations[0]);
    }

    #[test]
    fn empty_cohort_scores_zero() {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap();
        let report = generate_report(&[], &[], now);
        assert_eq!(report.cohort_score.value, 0);
        assert_eq!(report.cohort_score.grade, Grade::F);

        let records = vec![rec("a", 80.0, true)];
        let report = generate_report(&records, &[], now);
        assert!(report.cohort_score.value > 0);
    }

    #[test]
    fn healthy_metrics_fire_no_rules() {
        let metrics = ReportMetrics {
            total_records: 10,
            subject_count: 10,
            completed: 9,
            dropped: 0,
            completion_rate: 90,
            dropout_rate: 0.0,
            average_score: 85.0,
            average_progress: 90.0,
            average_session_duration: 50.0,
            session_duration_display: "50m".to_string(),
            malformed_records: 0,
        };
        let recs = recommendations(&RuleContext {
            metrics: &metrics,
            struggling_count: 0,
        });
        assert!(recs.is_empty());
    }
}
