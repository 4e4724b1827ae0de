// Metric primitives: ratios, percentages and durations from raw counts.
//
// Every function here is total. A zero denominator yields 0, a non-finite
// input is read as 0, and nothing panics.

use crate::util::finite_or_zero;

/// Percentage of completed items, rounded to the nearest integer.
/// Returns 0 when `total` is 0; never exceeds 100.
pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rate = (100.0 * completed as f64 / total as f64).round();
    rate.clamp(0.0, 100.0) as u32
}

/// Unrounded percentage `100 * part / whole`, 0 on a zero or non-finite whole.
pub fn percentage(part: f64, whole: f64) -> f64 {
    let part = finite_or_zero(part);
    let whole = finite_or_zero(whole);
    if whole == 0.0 {
        return 0.0;
    }
    finite_or_zero(100.0 * part / whole)
}

/// Mean of `total / count`, 0 when `count` is 0.
pub fn safe_average(total: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    finite_or_zero(finite_or_zero(total) / count as f64)
}

pub fn average_revenue_per_user(revenue: f64, users: usize) -> f64 {
    safe_average(revenue, users)
}

pub fn average_duration(total_minutes: f64, count: usize) -> f64 {
    safe_average(total_minutes, count)
}

/// Format minutes as "Hh Mm". Hours are omitted when zero.
pub fn format_duration(minutes: f64) -> String {
    let minutes = finite_or_zero(minutes).max(0.0).round() as u64;
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours == 0 {
        format!("{}m", rest)
    } else {
        format!("{}h {}m", hours, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_full_and_empty() {
        assert_eq!(completion_rate(25, 25), 100);
        assert_eq!(completion_rate(0, 25), 0);
        assert_eq!(completion_rate(0, 0), 0);
    }

    #[test]
    fn completion_rate_rounds_to_nearest() {
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
    }

    #[test]
    fn completion_rate_never_exceeds_hundred() {
        assert_eq!(completion_rate(30, 25), 100);
    }

    #[test]
    fn percentage_guards_division() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(f64::NAN, 10.0), 0.0);
        assert_eq!(percentage(5.0, f64::INFINITY), 0.0);
        assert!((percentage(1.0, 8.0) - 12.5).abs() < 1e-9);
    }

    #[test]
    fn averages_guard_zero_count() {
        assert_eq!(average_revenue_per_user(1200.0, 0), 0.0);
        assert_eq!(average_duration(90.0, 0), 0.0);
        assert_eq!(average_revenue_per_user(1200.0, 4), 300.0);
        assert_eq!(average_duration(90.0, 2), 45.0);
        assert_eq!(average_duration(f64::NAN, 2), 0.0);
    }

    #[test]
    fn format_duration_omits_zero_hours() {
        assert_eq!(format_duration(45.0), "45m");
        assert_eq!(format_duration(0.0), "0m");
        assert_eq!(format_duration(90.0), "1h 30m");
        assert_eq!(format_duration(120.0), "2h 0m");
    }

    #[test]
    fn format_duration_treats_bad_input_as_zero() {
        assert_eq!(format_duration(-15.0), "0m");
        assert_eq!(format_duration(f64::NAN), "0m");
        assert_eq!(format_duration(59.6), "1h 0m");
    }
}
