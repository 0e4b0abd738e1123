//! Human-readable duration strings for the dashboard.

const MS_PER_SECOND: f64 = 1000.0;
const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;

/// Formats a millisecond duration as hours and minutes.
///
/// Sub-minute remainders are discarded. Zero, negative and non-finite
/// inputs all render as `"0 minutes"`.
///
/// ```
/// use calstats_core::format_duration;
///
/// assert_eq!(format_duration(5_400_000.0), "1 hour 30 minutes");
/// assert_eq!(format_duration(7_200_000.0), "2 hours");
/// assert_eq!(format_duration(59_999.0), "0 minutes");
/// ```
pub fn format_duration(ms: f64) -> String {
    if !ms.is_finite() || ms <= 0.0 {
        return zero();
    }

    let total_seconds = (ms / MS_PER_SECOND).floor() as i64;
    let hours = total_seconds / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;

    match (hours, minutes) {
        (0, 0) => zero(),
        (h, 0) => plural(h, "hour"),
        (0, m) => plural(m, "minute"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}

fn zero() -> String {
    plural(0, "minute")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_below() {
        assert_eq!(format_duration(0.0), "0 minutes");
        assert_eq!(format_duration(-60_000.0), "0 minutes");
        assert_eq!(format_duration(f64::NAN), "0 minutes");
        assert_eq!(format_duration(f64::INFINITY), "0 minutes");
    }

    #[test]
    fn under_a_minute() {
        assert_eq!(format_duration(1.0), "0 minutes");
        assert_eq!(format_duration(59_999.0), "0 minutes");
    }

    #[test]
    fn minutes_only() {
        assert_eq!(format_duration(60_000.0), "1 minute");
        assert_eq!(format_duration(120_000.0), "2 minutes");
        assert_eq!(format_duration(59.0 * 60_000.0), "59 minutes");
    }

    #[test]
    fn hours_only() {
        assert_eq!(format_duration(3_600_000.0), "1 hour");
        assert_eq!(format_duration(86_400_000.0), "24 hours");
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(format_duration(3_660_000.0), "1 hour 1 minute");
        assert_eq!(format_duration(5_400_000.0), "1 hour 30 minutes");
        assert_eq!(format_duration(7_260_000.0), "2 hours 1 minute");
        assert_eq!(format_duration(9_000_000.0), "2 hours 30 minutes");
    }

    #[test]
    fn fractional_average_is_floored() {
        // 1h 29m 59.9s
        assert_eq!(format_duration(5_399_999.9), "1 hour 29 minutes");
    }
}
