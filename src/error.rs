/// Typed error for mentor-analytics library operations.
///
/// Arithmetic never produces one of these: zero denominators, missing fields
/// and non-finite numbers are absorbed as 0. Only configuration misuse and
/// input loading surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Parameters that make the requested computation impossible
    /// (e.g. more reviews per participant than other participants).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Parsing errors (JSON records, TOML config)
    #[error("parse error: {0}")]
    Parse(String),
    /// IO errors (file read/write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AnalyticsError::InvalidConfiguration(msg.into())
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for AnalyticsError {
    fn from(err: toml::de::Error) -> Self {
        AnalyticsError::Parse(format!("config: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
