// Scorer module: fixed-weight linear combination scores and their bands.
//
// Scoring formula (all scorers):
//   raw   = Σ metrics[k] * weights[k]   over the keys of the weight table
//           (missing or non-finite metric → 0)
//   score = clamp(round(raw), 0, 100)
//
// Grade bands:  ≥90 A, ≥80 B, ≥70 C, ≥60 D, else F
// Status bands: ≥85 Excellent, ≥70 Good, ≥60 Average, ≥50 Below Average, else Poor

use crate::error::{AnalyticsError, Result};
use crate::types::{Grade, Score, Status};
use crate::util::finite_or_zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named sub-metric values fed into a scorer.
pub type Metrics = BTreeMap<String, f64>;

// --- default weight tables ---
const ENGAGEMENT_WEIGHTS: &[(&str, f64)] = &[
    ("session_duration", 0.20),
    ("sessions_per_student", 0.15),
    ("lessons_per_session", 0.15),
    ("time_per_lesson", 0.10),
    ("bounce_rate", -0.10),
    ("retention_rate", 0.15),
    ("re_engagement_rate", 0.10),
    ("social_shares", 0.05),
];

const PERFORMANCE_WEIGHTS: &[(&str, f64)] = &[
    ("average_score", 0.40),
    ("completion_rate", 0.30),
    ("progress", 0.20),
    ("attendance_rate", 0.10),
];

const MENTOR_EFFECTIVENESS_WEIGHTS: &[(&str, f64)] = &[
    ("student_satisfaction", 0.30),
    ("student_success_rate", 0.25),
    ("session_completion_rate", 0.20),
    ("response_rate", 0.15),
    ("retention_rate", 0.10),
];

const COHORT_PERFORMANCE_WEIGHTS: &[(&str, f64)] = &[
    ("completion_rate", 0.30),
    ("average_score", 0.30),
    ("engagement_rate", 0.20),
    ("retention_rate", 0.20),
];

// --- band thresholds ---
const GRADE_BANDS: &[(f64, Grade)] = &[
    (90.0, Grade::A),
    (80.0, Grade::B),
    (70.0, Grade::C),
    (60.0, Grade::D),
];

const STATUS_BANDS: &[(f64, Status)] = &[
    (85.0, Status::Excellent),
    (70.0, Status::Good),
    (60.0, Status::Average),
    (50.0, Status::BelowAverage),
];

/// Mapping from sub-metric key to weight. Ordered so that iteration and
/// serialization are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(BTreeMap<String, f64>);

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(pairs.iter().map(|(k, w)| (k.to_string(), *w)).collect())
    }

    pub fn with(mut self, key: &str, weight: f64) -> Self {
        self.0.insert(key.to_string(), weight);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, w)| (k.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all weights. Documented tables sum to roughly 1.0 but this is
    /// not enforced.
    pub fn total_weight(&self) -> f64 {
        self.0.values().copied().map(finite_or_zero).sum()
    }

    /// Reject tables that reference none of `known_keys`, or carry a
    /// non-finite weight.
    pub fn validate(&self, name: &str, known_keys: &[&str]) -> Result<()> {
        if let Some((key, _)) = self.0.iter().find(|(_, w)| !w.is_finite()) {
            return Err(AnalyticsError::invalid(format!(
                "{} weight for '{}' is not a finite number",
                name, key
            )));
        }
        if !self.0.keys().any(|k| known_keys.contains(&k.as_str())) {
            return Err(AnalyticsError::invalid(format!(
                "{} weight table references no known metric (expected any of: {})",
                name,
                known_keys.join(", ")
            )));
        }
        Ok(())
    }
}

/// The concrete scorers and their published weight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Engagement,
    Performance,
    MentorEffectiveness,
    CohortPerformance,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 4] = [
        ScoreKind::Engagement,
        ScoreKind::Performance,
        ScoreKind::MentorEffectiveness,
        ScoreKind::CohortPerformance,
    ];

    fn weight_pairs(&self) -> &'static [(&'static str, f64)] {
        match self {
            ScoreKind::Engagement => ENGAGEMENT_WEIGHTS,
            ScoreKind::Performance => PERFORMANCE_WEIGHTS,
            ScoreKind::MentorEffectiveness => MENTOR_EFFECTIVENESS_WEIGHTS,
            ScoreKind::CohortPerformance => COHORT_PERFORMANCE_WEIGHTS,
        }
    }

    pub fn default_weights(&self) -> WeightTable {
        WeightTable::from_pairs(self.weight_pairs())
    }

    /// Metric keys this scorer understands.
    pub fn known_keys(&self) -> Vec<&'static str> {
        self.weight_pairs().iter().map(|(k, _)| *k).collect()
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreKind::Engagement => write!(f, "engagement"),
            ScoreKind::Performance => write!(f, "performance"),
            ScoreKind::MentorEffectiveness => write!(f, "mentor_effectiveness"),
            ScoreKind::CohortPerformance => write!(f, "cohort_performance"),
        }
    }
}

/// Build a metric map from literal pairs.
pub fn metrics_from(pairs: &[(&str, f64)]) -> Metrics {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Unclamped weighted sum over the keys of the weight table.
pub fn weighted_sum(metrics: &Metrics, weights: &WeightTable) -> f64 {
    weights
        .iter()
        .map(|(key, weight)| {
            let value = metrics.get(key).copied().map(finite_or_zero).unwrap_or(0.0);
            value * finite_or_zero(weight)
        })
        .sum()
}

/// Weighted score rounded and clamped to 0..=100. Never fails.
pub fn score(metrics: &Metrics, weights: &WeightTable) -> u8 {
    clamp_score(weighted_sum(metrics, weights))
}

/// Score with both bands attached.
pub fn score_with_bands(metrics: &Metrics, weights: &WeightTable) -> Score {
    Score::from_value(score(metrics, weights))
}

fn clamp_score(raw: f64) -> u8 {
    finite_or_zero(raw).round().clamp(0.0, 100.0) as u8
}

fn clamp_band_input(score: f64) -> f64 {
    finite_or_zero(score).clamp(0.0, 100.0)
}

/// Letter grade for any numeric input; out-of-range values are clamped first.
pub fn grade(score: f64) -> Grade {
    let s = clamp_band_input(score);
    GRADE_BANDS
        .iter()
        .find(|(min, _)| s >= *min)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::F)
}

/// Effectiveness status for any numeric input; out-of-range values are clamped first.
pub fn status(score: f64) -> Status {
    let s = clamp_band_input(score);
    STATUS_BANDS
        .iter()
        .find(|(min, _)| s >= *min)
        .map(|(_, st)| *st)
        .unwrap_or(Status::Poor)
}

impl Score {
    pub fn from_value(value: u8) -> Self {
        let value = value.min(100);
        Score {
            value,
            grade: grade(value as f64),
            status: status(value as f64),
        }
    }
}
