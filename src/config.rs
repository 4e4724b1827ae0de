// Engine configuration: weight tables, report tunables and matching defaults,
// read from a TOML file. Every field has a default, so a partial file only
// overrides what it names. A weight table given in the file replaces the
// default table for that scorer as a whole.

use crate::error::{AnalyticsError, Result};
use crate::matching::MatchStrategy;
use crate::report::ReportOptions;
use crate::scorer::{ScoreKind, WeightTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "mentor-analytics";
const CONFIG_FILE: &str = "config.toml";

/// Weight table per scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub engagement: WeightTable,
    pub performance: WeightTable,
    pub mentor_effectiveness: WeightTable,
    pub cohort_performance: WeightTable,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            engagement: ScoreKind::Engagement.default_weights(),
            performance: ScoreKind::Performance.default_weights(),
            mentor_effectiveness: ScoreKind::MentorEffectiveness.default_weights(),
            cohort_performance: ScoreKind::CohortPerformance.default_weights(),
        }
    }
}

impl WeightsConfig {
    pub fn table(&self, kind: ScoreKind) -> &WeightTable {
        match kind {
            ScoreKind::Engagement => &self.engagement,
            ScoreKind::Performance => &self.performance,
            ScoreKind::MentorEffectiveness => &self.mentor_effectiveness,
            ScoreKind::CohortPerformance => &self.cohort_performance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub strategy: MatchStrategy,
    pub reviews_per_participant: usize,
    pub mentor_capacity: usize,
    /// Fixed RNG seed for reproducible random matching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Random,
            reviews_per_participant: 2,
            mentor_capacity: 5,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: WeightsConfig,
    pub report: ReportOptions,
    pub matching: MatchingConfig,
}

impl EngineConfig {
    /// Reject configurations the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        for kind in ScoreKind::ALL {
            self.weights
                .table(kind)
                .validate(&kind.to_string(), &kind.known_keys())?;
        }
        if !self.report.struggling_threshold.is_finite() {
            return Err(AnalyticsError::invalid(
                "report.struggling_threshold must be a finite number",
            ));
        }
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AnalyticsError::Parse(e.to_string()))
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load `path` if given; otherwise the default location if it exists;
    /// otherwise built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `<config_dir>/mentor-analytics/config.toml`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RankMetric;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_named_fields() {
        let config = EngineConfig::from_toml(
            r#"
            [report]
            top_n = 5
            rank_metric = "progress"

            [weights.performance]
            average_score = 0.7
            completion_rate = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(config.report.top_n, 5);
        assert_eq!(config.report.rank_metric, RankMetric::Progress);
        assert_eq!(config.report.struggling_threshold, 50.0);
        assert_eq!(config.weights.performance.len(), 2);
        assert_eq!(config.weights.performance.get("average_score"), Some(0.7));
        assert_eq!(
            config.weights.engagement,
            ScoreKind::Engagement.default_weights()
        );
    }

    #[test]
    fn unknown_only_weights_are_rejected() {
        let result = EngineConfig::from_toml(
            r#"
            [weights.engagement]
            clicks = 1.0
            "#,
        );
        assert!(matches!(result, Err(AnalyticsError::InvalidConfiguration(_))));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let result = EngineConfig::from_toml("[report\ntop_n = ");
        assert!(matches!(result, Err(AnalyticsError::Parse(_))));
    }

    #[test]
    fn toml_round_trip_preserves_config() {
        let mut config = EngineConfig::default();
        config.matching.seed = Some(7);
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }
}
