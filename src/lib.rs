pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod matching;
pub mod metrics;
pub mod report;
pub mod scorer;
pub mod trend;
pub mod types;
pub mod util;

pub use config::EngineConfig;
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use matching::MatchStrategy;
pub use report::{ReportInput, ReportOptions};
pub use scorer::{ScoreKind, WeightTable};
pub use types::*;
