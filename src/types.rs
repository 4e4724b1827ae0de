use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::finite_or_zero;

/// A single measured event: one enrollment, one session, one transaction.
///
/// Every measured field is optional. A missing or non-finite field
/// contributes 0 to every aggregate it takes part in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(default)]
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Assessment score, 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Course progress, 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped: Option<bool>,
    /// Revenue or any other summable amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl MetricRecord {
    pub fn score_or_zero(&self) -> f64 {
        self.score.map(finite_or_zero).unwrap_or(0.0)
    }

    pub fn progress_or_zero(&self) -> f64 {
        self.progress.map(finite_or_zero).unwrap_or(0.0)
    }

    pub fn duration_or_zero(&self) -> f64 {
        self.duration_minutes.map(finite_or_zero).unwrap_or(0.0)
    }

    pub fn value_or_zero(&self) -> f64 {
        self.value.map(finite_or_zero).unwrap_or(0.0)
    }

    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.unwrap_or(false)
    }

    /// No subject or no measured field at all.
    pub fn is_malformed(&self) -> bool {
        self.subject_id.is_empty()
            || (self.score.is_none()
                && self.progress.is_none()
                && self.duration_minutes.is_none()
                && self.completed.is_none()
                && self.dropped.is_none()
                && self.value.is_none())
    }
}

// ── Scoring types ──

/// Letter grade band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn label(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Presentation colour tag
    pub fn color(&self) -> &'static str {
        match self {
            Grade::A => "green",
            Grade::B => "blue",
            Grade::C => "yellow",
            Grade::D => "orange",
            Grade::F => "red",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Effectiveness / status band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Below Average")]
    BelowAverage,
    Poor,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Excellent => write!(f, "Excellent"),
            Status::Good => write!(f, "Good"),
            Status::Average => write!(f, "Average"),
            Status::BelowAverage => write!(f, "Below Average"),
            Status::Poor => write!(f, "Poor"),
        }
    }
}

/// Result of a weighted scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// 0..=100
    pub value: u8,
    pub grade: Grade,
    pub status: Status,
}

// ── Trend & forecast types ──

/// One calendar month of aggregated history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// "YYYY-MM"
    pub period: String,
    pub total: usize,
    pub completed: usize,
    pub completion_rate: u32,
    /// Sum of record values in the period
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Optimistic,
    Realistic,
    Pessimistic,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Optimistic => write!(f, "optimistic"),
            ScenarioKind::Realistic => write!(f, "realistic"),
            ScenarioKind::Pessimistic => write!(f, "pessimistic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub value: f64,
    /// Fixed percentage, not computed
    pub probability: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Growing,
    Flat,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Period being forecast ("YYYY-MM"), empty for bare value series
    pub period: String,
    pub forecasted_value: f64,
    /// 0..=100; 0 also signals insufficient data
    pub confidence_level: f64,
    pub slope: f64,
    pub intercept: f64,
    /// Percent change from the last observed value to the forecast
    pub growth_rate: f64,
    pub direction: Direction,
    pub scenarios: Vec<Scenario>,
}

// ── Matching types ──

/// A participant in peer review or mentoring, with optional attributes
/// used by attribute-based strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Performance score, 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<f64>,
    /// Ids an instructor assigned this participant to review
    #[serde(default)]
    pub assigned: Vec<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    pub reviewer_id: String,
    pub reviewee_id: String,
    /// 0.0..=1.0
    pub compatibility_score: f64,
    pub reason: String,
}

// ── Report types ──

/// Per-subject aggregate used for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    pub record_count: usize,
    pub average_score: f64,
    pub average_progress: f64,
    pub completion_rate: u32,
}

/// Aggregate primitives computed over a report's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub total_records: usize,
    pub subject_count: usize,
    pub completed: usize,
    pub dropped: usize,
    pub completion_rate: u32,
    /// Unrounded percentage of dropped records
    pub dropout_rate: f64,
    pub average_score: f64,
    pub average_progress: f64,
    pub average_session_duration: f64,
    pub session_duration_display: String,
    pub malformed_records: usize,
}

/// Read-only snapshot produced by a single report generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub metrics: ReportMetrics,
    pub cohort_score: Score,
    pub top_performers: Vec<SubjectSummary>,
    pub struggling: Vec<SubjectSummary>,
    pub trend: Vec<TrendPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastResult>,
    pub recommendations: Vec<String>,
}
