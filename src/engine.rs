// Analytics engine: an explicitly constructed, immutable bundle of
// configuration in front of the stateless module functions. Holds no
// mutable state, so one instance can be shared freely across threads.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::forecast;
use crate::matching::{self, MatchStrategy};
use crate::report::{self, ReportInput};
use crate::scorer::{self, Metrics, ScoreKind};
use crate::trend::TrendMetric;
use crate::types::{ForecastResult, MatchPair, Participant, Report, Score, TrendPoint};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: EngineConfig,
}

impl AnalyticsEngine {
    /// Build an engine, rejecting invalid weight tables up front.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Scoring ──

    pub fn score(&self, kind: ScoreKind, metrics: &Metrics) -> Score {
        scorer::score_with_bands(metrics, self.config.weights.table(kind))
    }

    pub fn engagement_score(&self, metrics: &Metrics) -> Score {
        self.score(ScoreKind::Engagement, metrics)
    }

    pub fn performance_score(&self, metrics: &Metrics) -> Score {
        self.score(ScoreKind::Performance, metrics)
    }

    pub fn mentor_effectiveness_score(&self, metrics: &Metrics) -> Score {
        self.score(ScoreKind::MentorEffectiveness, metrics)
    }

    pub fn cohort_performance_score(&self, metrics: &Metrics) -> Score {
        self.score(ScoreKind::CohortPerformance, metrics)
    }

    // ── Reports ──

    pub fn generate_report(&self, input: &ReportInput, now: DateTime<Utc>) -> Report {
        report::assemble_report(
            input.label.as_deref(),
            &input.records,
            &input.history,
            now,
            &self.config.report,
            &self.config.weights.cohort_performance,
        )
    }

    /// Generate independent reports in parallel. Output order matches input
    /// order, and every report shares the same `now`.
    pub fn generate_reports(&self, inputs: &[ReportInput], now: DateTime<Utc>) -> Vec<Report> {
        tracing::info!(reports = inputs.len(), "generating report batch");
        inputs
            .par_iter()
            .map(|input| self.generate_report(input, now))
            .collect()
    }

    pub fn forecast(&self, series: &[TrendPoint]) -> ForecastResult {
        self.forecast_metric(series, self.config.report.forecast_metric)
    }

    pub fn forecast_metric(&self, series: &[TrendPoint], metric: TrendMetric) -> ForecastResult {
        forecast::forecast(series, metric)
    }

    // ── Matching ──

    /// RNG for matching: seeded from config when a seed is set.
    pub fn matching_rng(&self) -> ChaCha8Rng {
        match self.config.matching.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Peer-review matches with the configured strategy and review count.
    pub fn generate_matches(&self, participants: &[Participant]) -> Result<Vec<MatchPair>> {
        let mut rng = self.matching_rng();
        self.generate_matches_with(
            participants,
            self.config.matching.reviews_per_participant,
            self.config.matching.strategy,
            &mut rng,
        )
    }

    pub fn generate_matches_with<R: Rng + ?Sized>(
        &self,
        participants: &[Participant],
        reviews_per_participant: usize,
        strategy: MatchStrategy,
        rng: &mut R,
    ) -> Result<Vec<MatchPair>> {
        matching::generate_matches(participants, reviews_per_participant, strategy, rng)
    }

    pub fn assign_mentors(
        &self,
        students: &[Participant],
        mentors: &[Participant],
    ) -> Result<Vec<MatchPair>> {
        let mut rng = self.matching_rng();
        matching::assign_mentors(
            students,
            mentors,
            self.config.matching.mentor_capacity,
            self.config.matching.strategy,
            &mut rng,
        )
    }
}
