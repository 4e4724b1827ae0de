use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use mentor_analytics::{
    config, forecast, matching, scorer, trend, util, AnalyticsEngine, EngineConfig,
    MatchStrategy, MetricRecord, Participant, Report, ReportInput, ScoreKind, TrendPoint,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MENTOR_ANALYTICS_LOG";

#[derive(Parser)]
#[command(name = "mentor-analytics")]
#[command(about = "Completion, engagement and forecast analytics for mentorship programs")]
struct Cli {
    /// Config file (default: <config dir>/mentor-analytics/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a report from exported records
    Report {
        /// JSON array of records to aggregate
        #[arg(short, long)]
        records: PathBuf,
        /// JSON array of historical records for the 12-month trend
        #[arg(long)]
        history: Option<PathBuf>,
        /// Label stored in the report
        #[arg(short, long)]
        label: Option<String>,
        /// Reference instant (RFC 3339) for period bucketing
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
        /// Print a short text summary instead of JSON
        #[arg(long)]
        summary: bool,
    },

    /// Generate many independent reports in parallel
    Batch {
        /// JSON array of {label, records, history} objects
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },

    /// Bucket historical records into monthly periods
    Trend {
        #[arg(long)]
        history: PathBuf,
        /// Number of months ending at the current one
        #[arg(short, long, default_value = "12")]
        months: usize,
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },

    /// Forecast the next period from a trend series or a list of numbers
    Forecast {
        /// JSON array of trend points or of numbers
        #[arg(short, long)]
        input: PathBuf,
        /// Trend dimension to forecast (trend point input only)
        #[arg(short, long, value_enum)]
        metric: Option<MetricArg>,
    },

    /// Compute a weighted score from key=value metrics
    Score {
        #[arg(value_enum)]
        kind: KindArg,
        /// Metric values, e.g. -m session_duration=45
        #[arg(short, long = "metric", value_parser = parse_key_val)]
        metrics: Vec<(String, f64)>,
    },

    /// Show grade and status bands for a score
    Grade {
        #[arg(allow_negative_numbers = true)]
        score: f64,
    },

    /// Generate peer-review matches
    Match {
        /// JSON array of participant ids or participant objects
        #[arg(short, long)]
        participants: PathBuf,
        /// Reviews each participant writes
        #[arg(short, long)]
        reviews: Option<usize>,
        #[arg(short, long, value_parser = parse_strategy)]
        strategy: Option<MatchStrategy>,
        /// RNG seed for reproducible random matching
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Assign mentors to students
    Assign {
        #[arg(long)]
        students: PathBuf,
        #[arg(long)]
        mentors: PathBuf,
        /// Maximum students per mentor
        #[arg(long)]
        capacity: Option<usize>,
        #[arg(short, long, value_parser = parse_strategy)]
        strategy: Option<MatchStrategy>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print the default config file location instead
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Engagement,
    Performance,
    MentorEffectiveness,
    CohortPerformance,
}

impl From<KindArg> for ScoreKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Engagement => ScoreKind::Engagement,
            KindArg::Performance => ScoreKind::Performance,
            KindArg::MentorEffectiveness => ScoreKind::MentorEffectiveness,
            KindArg::CohortPerformance => ScoreKind::CohortPerformance,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Total,
    Completed,
    CompletionRate,
    Value,
}

impl From<MetricArg> for trend::TrendMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Total => trend::TrendMetric::Total,
            MetricArg::Completed => trend::TrendMetric::Completed,
            MetricArg::CompletionRate => trend::TrendMetric::CompletionRate,
            MetricArg::Value => trend::TrendMetric::Value,
        }
    }
}

/// Participants may be listed as bare ids or full objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum ParticipantEntry {
    Id(String),
    Full(Participant),
}

impl From<ParticipantEntry> for Participant {
    fn from(entry: ParticipantEntry) -> Self {
        match entry {
            ParticipantEntry::Id(id) => Participant::new(id),
            ParticipantEntry::Full(p) => p,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ForecastInput {
    Series(Vec<TrendPoint>),
    Values(Vec<f64>),
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{}': {}", s, e))
}

fn parse_key_val(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid number for '{}': {}", key, e))?;
    Ok((key.trim().to_string(), value))
}

fn parse_strategy(s: &str) -> Result<MatchStrategy, String> {
    s.parse().map_err(|e: mentor_analytics::AnalyticsError| e.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::Config { path: true } = cli.command {
        match config::default_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config directory on this platform)"),
        }
        return Ok(());
    }

    let config = EngineConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let engine = AnalyticsEngine::new(config).context("invalid configuration")?;

    match cli.command {
        Command::Report {
            records,
            history,
            label,
            now,
            summary,
        } => cmd_report(&engine, records, history, label, now, summary),
        Command::Batch { input, now } => cmd_batch(&engine, input, now),
        Command::Trend {
            history,
            months,
            now,
        } => cmd_trend(history, months, now),
        Command::Forecast { input, metric } => cmd_forecast(&engine, input, metric),
        Command::Score { kind, metrics } => cmd_score(&engine, kind.into(), metrics),
        Command::Grade { score } => cmd_grade(score),
        Command::Match {
            participants,
            reviews,
            strategy,
            seed,
        } => cmd_match(&engine, participants, reviews, strategy, seed),
        Command::Assign {
            students,
            mentors,
            capacity,
            strategy,
            seed,
        } => cmd_assign(&engine, students, mentors, capacity, strategy, seed),
        Command::Config { .. } => {
            print!("{}", engine.config().to_toml()?);
            Ok(())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn read_participants(path: &Path) -> Result<Vec<Participant>> {
    let entries: Vec<ParticipantEntry> = read_json(path)?;
    Ok(entries.into_iter().map(Participant::from).collect())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn rng_for(engine: &AnalyticsEngine, seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => engine.matching_rng(),
    }
}

fn cmd_report(
    engine: &AnalyticsEngine,
    records: PathBuf,
    history: Option<PathBuf>,
    label: Option<String>,
    now: Option<DateTime<Utc>>,
    summary: bool,
) -> Result<()> {
    let records: Vec<MetricRecord> = read_json(&records)?;
    let history: Vec<MetricRecord> = match history {
        Some(path) => read_json(&path)?,
        None => Vec::new(),
    };
    eprintln!(
        "Generating report from {} records ({} historical)...",
        records.len(),
        history.len()
    );

    let input = ReportInput {
        label,
        records,
        history,
    };
    let report = engine.generate_report(&input, now.unwrap_or_else(Utc::now));

    if summary {
        print_summary(&report)
    } else {
        print_json(&report)
    }
}

fn print_summary(report: &Report) -> Result<()> {
    let m = &report.metrics;
    println!("=== {} ===", report.label.as_deref().unwrap_or("Report"));
    println!("Records: {} ({} subjects)", m.total_records, m.subject_count);
    println!("Completion rate: {}%", m.completion_rate);
    println!("Dropout rate: {:.1}%", m.dropout_rate);
    println!("Average score: {:.1}", m.average_score);
    println!("Average session: {}", m.session_duration_display);
    println!(
        "Cohort score: {} ({}, {})",
        report.cohort_score.value, report.cohort_score.grade, report.cohort_score.status
    );
    println!();

    println!("Top performers:");
    for s in &report.top_performers {
        let name = s.subject_name.as_deref().unwrap_or(&s.subject_id);
        println!("  {:<32} {:>6.1}", util::truncate(name, 30), s.average_score);
    }
    if !report.struggling.is_empty() {
        println!("Struggling:");
        for s in &report.struggling {
            let name = s.subject_name.as_deref().unwrap_or(&s.subject_id);
            println!("  {:<32} {:>6.1}", util::truncate(name, 30), s.average_score);
        }
    }

    if let Some(f) = &report.forecast {
        println!();
        println!(
            "Forecast {}: {:.2} (confidence {:.0}%)",
            f.period, f.forecasted_value, f.confidence_level
        );
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for r in &report.recommendations {
            println!("  - {}", r);
        }
    }

    println!();
    println!("Fingerprint: {}", report.fingerprint()?);
    Ok(())
}

fn cmd_batch(engine: &AnalyticsEngine, input: PathBuf, now: Option<DateTime<Utc>>) -> Result<()> {
    let inputs: Vec<ReportInput> = read_json(&input)?;
    eprintln!("Generating {} reports...", inputs.len());
    let reports = engine.generate_reports(&inputs, now.unwrap_or_else(Utc::now));
    print_json(&reports)
}

fn cmd_trend(history: PathBuf, months: usize, now: Option<DateTime<Utc>>) -> Result<()> {
    let records: Vec<MetricRecord> = read_json(&history)?;
    let series = trend::generate_trend_with(&records, now.unwrap_or_else(Utc::now), months);
    print_json(&series)
}

fn cmd_forecast(
    engine: &AnalyticsEngine,
    input: PathBuf,
    metric: Option<MetricArg>,
) -> Result<()> {
    let result = match read_json::<ForecastInput>(&input)? {
        ForecastInput::Series(series) => match metric {
            Some(metric) => engine.forecast_metric(&series, metric.into()),
            None => engine.forecast(&series),
        },
        ForecastInput::Values(values) => forecast::forecast_values(&values, ""),
    };
    if result.confidence_level == 0.0 {
        eprintln!("Warning: forecast confidence is 0 (insufficient or degenerate data)");
    }
    print_json(&result)
}

fn cmd_score(engine: &AnalyticsEngine, kind: ScoreKind, metrics: Vec<(String, f64)>) -> Result<()> {
    let known = kind.known_keys();
    for (key, _) in &metrics {
        if !known.contains(&key.as_str()) {
            eprintln!("Warning: '{}' is not part of the {} weight table", key, kind);
        }
    }
    let metrics: scorer::Metrics = metrics.into_iter().collect();
    let score = engine.score(kind, &metrics);
    print_json(&score)
}

fn cmd_grade(score: f64) -> Result<()> {
    let grade = scorer::grade(score);
    let status = scorer::status(score);
    println!("Grade: {} ({})", grade, grade.color());
    println!("Status: {}", status);
    Ok(())
}

fn cmd_match(
    engine: &AnalyticsEngine,
    participants: PathBuf,
    reviews: Option<usize>,
    strategy: Option<MatchStrategy>,
    seed: Option<u64>,
) -> Result<()> {
    let participants = read_participants(&participants)?;
    let reviews = reviews.unwrap_or(engine.config().matching.reviews_per_participant);
    let strategy = strategy.unwrap_or(engine.config().matching.strategy);
    let mut rng = rng_for(engine, seed);

    eprintln!(
        "Matching {} participants ({} reviews each, {} strategy)...",
        participants.len(),
        reviews,
        strategy
    );
    let pairs = engine.generate_matches_with(&participants, reviews, strategy, &mut rng)?;
    print_json(&pairs)
}

fn cmd_assign(
    engine: &AnalyticsEngine,
    students: PathBuf,
    mentors: PathBuf,
    capacity: Option<usize>,
    strategy: Option<MatchStrategy>,
    seed: Option<u64>,
) -> Result<()> {
    let students = read_participants(&students)?;
    let mentors = read_participants(&mentors)?;
    let capacity = capacity.unwrap_or(engine.config().matching.mentor_capacity);
    let strategy = strategy.unwrap_or(engine.config().matching.strategy);
    let mut rng = rng_for(engine, seed);

    eprintln!(
        "Assigning {} students to {} mentors (capacity {})...",
        students.len(),
        mentors.len(),
        capacity
    );
    let pairs = matching::assign_mentors(&students, &mentors, capacity, strategy, &mut rng)?;
    print_json(&pairs)
}
