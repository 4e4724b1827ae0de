// Forecast module: ordinary least squares over a trend series.
//
//   x_i        = zero-based period index, y_i = value
//   slope      = (nΣxy − ΣxΣy) / (nΣx² − (Σx)²)
//   intercept  = (Σy − slope·Σx) / n
//   forecast   = max(0, intercept + slope·n)
//   mse        = mean((y_i − (slope·x_i + intercept))²)
//   confidence = clamp(100 − 100·sqrt(mse)/forecast, 0, 100), 0 if forecast == 0
//
// Fewer than MIN_POINTS values produce a zero forecast with confidence 0.

use crate::trend::{next_period, TrendMetric};
use crate::types::{Direction, ForecastResult, Scenario, ScenarioKind, TrendPoint};
use crate::util::finite_or_zero;

pub const MIN_POINTS: usize = 3;

// (kind, multiplier, probability)
const SCENARIOS: &[(ScenarioKind, f64, u8)] = &[
    (ScenarioKind::Optimistic, 1.2, 25),
    (ScenarioKind::Realistic, 1.0, 50),
    (ScenarioKind::Pessimistic, 0.8, 25),
];

/// Slope smaller than this in magnitude is reported as flat.
const FLAT_SLOPE_EPSILON: f64 = 1e-9;

/// Closed-form least squares fit. Returns (slope, intercept).
pub fn linear_regression(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        let y = finite_or_zero(*y);
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

/// Mean squared residual of the fit against the observed values.
fn mean_squared_residual(values: &[f64], slope: f64, intercept: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| {
            let predicted = slope * i as f64 + intercept;
            let residual = finite_or_zero(*y) - predicted;
            residual * residual
        })
        .sum();
    total / values.len() as f64
}

fn scenarios_for(value: f64) -> Vec<Scenario> {
    SCENARIOS
        .iter()
        .map(|(kind, multiplier, probability)| Scenario {
            kind: *kind,
            value: value * multiplier,
            probability: *probability,
        })
        .collect()
}

fn zero_forecast(period: String) -> ForecastResult {
    ForecastResult {
        period,
        forecasted_value: 0.0,
        confidence_level: 0.0,
        slope: 0.0,
        intercept: 0.0,
        growth_rate: 0.0,
        direction: Direction::Flat,
        scenarios: scenarios_for(0.0),
    }
}

/// Forecast the value following `values`. `period` labels the forecast.
pub fn forecast_values(values: &[f64], period: impl Into<String>) -> ForecastResult {
    let period = period.into();
    if values.len() < MIN_POINTS {
        tracing::warn!(
            points = values.len(),
            required = MIN_POINTS,
            "insufficient data for forecast"
        );
        return zero_forecast(period);
    }

    let n = values.len();
    let (slope, intercept) = linear_regression(values);
    let forecasted_value = finite_or_zero(intercept + slope * n as f64).max(0.0);

    let confidence_level = if forecasted_value > 0.0 {
        let mse = mean_squared_residual(values, slope, intercept);
        finite_or_zero(100.0 - 100.0 * mse.sqrt() / forecasted_value).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let last = finite_or_zero(values[n - 1]);
    let growth_rate = if last == 0.0 {
        0.0
    } else {
        finite_or_zero((forecasted_value - last) / last.abs() * 100.0)
    };

    let direction = if slope > FLAT_SLOPE_EPSILON {
        Direction::Growing
    } else if slope < -FLAT_SLOPE_EPSILON {
        Direction::Declining
    } else {
        Direction::Flat
    };

    tracing::debug!(
        points = n,
        slope,
        intercept,
        forecasted_value,
        confidence_level,
        "forecast computed"
    );

    ForecastResult {
        period,
        forecasted_value,
        confidence_level,
        slope,
        intercept,
        growth_rate,
        direction,
        scenarios: scenarios_for(forecasted_value),
    }
}

/// Forecast the period after the last point of `series`, over one dimension.
pub fn forecast(series: &[TrendPoint], metric: TrendMetric) -> ForecastResult {
    let values: Vec<f64> = series.iter().map(|p| p.metric(metric)).collect();
    let period = series
        .last()
        .and_then(|p| next_period(&p.period))
        .unwrap_or_default();
    forecast_values(&values, period)
}
