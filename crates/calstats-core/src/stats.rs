//! Aggregate statistics over a set of normalized events.
//!
//! [`aggregate_stats`] reduces a slice of [`NormalizedEvent`]s to one
//! [`CalendarStats`] value, the JSON object the dashboard renders.

use chrono::{Local, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

use crate::event::NormalizedEvent;
use crate::format::format_duration;

/// Day name reported when there are no events.
pub const NO_BUSIEST_DAY: &str = "N/A";

/// The weekday with the most events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusiestDay {
    /// English weekday name, e.g. `"Tuesday"`.
    pub day: String,
    /// Number of events starting on that weekday.
    pub count: usize,
}

impl BusiestDay {
    fn none() -> Self {
        Self {
            day: NO_BUSIEST_DAY.to_string(),
            count: 0,
        }
    }
}

/// Statistics for one query range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarStats {
    pub total_events: usize,
    /// Sum of event durations in milliseconds.
    pub total_duration: i64,
    /// Mean event duration in milliseconds.
    pub average_duration: f64,
    pub solo_meetings: usize,
    pub guest_meetings: usize,
    pub busiest_day: BusiestDay,
    pub total_duration_formatted: String,
    pub average_duration_formatted: String,
}

impl CalendarStats {
    /// Stats for a range with no events.
    pub fn empty() -> Self {
        Self {
            total_events: 0,
            total_duration: 0,
            average_duration: 0.0,
            solo_meetings: 0,
            guest_meetings: 0,
            busiest_day: BusiestDay::none(),
            total_duration_formatted: format_duration(0.0),
            average_duration_formatted: format_duration(0.0),
        }
    }
}

/// Computes stats, bucketing weekdays in the machine's local timezone.
pub fn aggregate_stats(events: &[NormalizedEvent]) -> CalendarStats {
    aggregate_stats_in(events, &Local)
}

/// Computes stats, bucketing weekdays in `tz`.
///
/// All-day events are bucketed by their calendar date. When several
/// weekdays share the highest count, the one seen first in `events` wins.
pub fn aggregate_stats_in<Tz: TimeZone>(events: &[NormalizedEvent], tz: &Tz) -> CalendarStats {
    if events.is_empty() {
        return CalendarStats::empty();
    }

    let total_events = events.len();
    let total_duration: i64 = events.iter().map(|e| e.duration_ms).sum();
    let average_duration = total_duration as f64 / total_events as f64;
    let solo_meetings = events.iter().filter(|e| e.is_solo()).count();

    // Insertion-ordered histogram; at most seven entries.
    let mut histogram: Vec<(Weekday, usize)> = Vec::with_capacity(7);
    for event in events {
        let weekday = event.start.weekday_in(tz);
        match histogram.iter_mut().find(|(day, _)| *day == weekday) {
            Some((_, count)) => *count += 1,
            None => histogram.push((weekday, 1)),
        }
    }

    let busiest_day = histogram
        .iter()
        .fold(None::<(Weekday, usize)>, |best, &(day, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((day, count)),
        })
        .map(|(day, count)| BusiestDay {
            day: weekday_name(day).to_string(),
            count,
        })
        .unwrap_or_else(BusiestDay::none);

    tracing::debug!(
        total_events,
        total_duration,
        busiest_day = %busiest_day.day,
        "aggregated calendar stats"
    );

    CalendarStats {
        total_events,
        total_duration,
        average_duration,
        solo_meetings,
        guest_meetings: total_events - solo_meetings,
        busiest_day,
        total_duration_formatted: format_duration(total_duration as f64),
        average_duration_formatted: format_duration(average_duration),
    }
}

/// English name of a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::EventTime;
    use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn timed(id: &str, start: DateTime<Utc>, minutes: i64) -> NormalizedEvent {
        NormalizedEvent::new(
            id,
            "Meeting",
            EventTime::from_utc(start),
            EventTime::from_utc(start + Duration::minutes(minutes)),
        )
    }

    fn all_day(id: &str, day: NaiveDate) -> NormalizedEvent {
        NormalizedEvent::new(
            id,
            "Holiday",
            EventTime::from_date(day),
            EventTime::from_date(day.succ_opt().unwrap()),
        )
    }

    // 2025-02-03 is a Monday.
    const MON: u32 = 3;
    const TUE: u32 = 4;
    const WED: u32 = 5;

    mod empty {
        use super::*;

        #[test]
        fn empty_input() {
            let stats = aggregate_stats_in(&[], &Utc);
            assert_eq!(stats, CalendarStats::empty());
            assert_eq!(stats.total_events, 0);
            assert_eq!(stats.average_duration, 0.0);
            assert_eq!(stats.busiest_day.day, "N/A");
            assert_eq!(stats.busiest_day.count, 0);
            assert_eq!(stats.average_duration_formatted, "0 minutes");
            assert_eq!(stats.total_duration_formatted, "0 minutes");
        }

        #[test]
        fn empty_wire_shape() {
            insta::assert_json_snapshot!(CalendarStats::empty(), @r###"
            {
              "totalEvents": 0,
              "totalDuration": 0,
              "averageDuration": 0.0,
              "soloMeetings": 0,
              "guestMeetings": 0,
              "busiestDay": {
                "day": "N/A",
                "count": 0
              },
              "totalDurationFormatted": "0 minutes",
              "averageDurationFormatted": "0 minutes"
            }
            "###);
        }
    }

    mod counting {
        use super::*;

        #[test]
        fn single_solo_meeting() {
            let events = [timed("a", utc(2025, 2, WED, 10, 0, 0), 90)];
            let stats = aggregate_stats_in(&events, &Utc);

            assert_eq!(stats.total_events, 1);
            assert_eq!(stats.solo_meetings, 1);
            assert_eq!(stats.guest_meetings, 0);
            assert_eq!(stats.total_duration, 5_400_000);
            assert_eq!(stats.average_duration_formatted, "1 hour 30 minutes");
            assert_eq!(stats.busiest_day, BusiestDay { day: "Wednesday".into(), count: 1 });
        }

        #[test]
        fn solo_and_guest_split() {
            let events = [
                timed("a", utc(2025, 2, MON, 9, 0, 0), 30),
                timed("b", utc(2025, 2, MON, 10, 0, 0), 30).with_attendees(["x@example.com"]),
                timed("c", utc(2025, 2, TUE, 9, 0, 0), 60)
                    .with_attendees(["x@example.com", "y@example.com"]),
            ];
            let stats = aggregate_stats_in(&events, &Utc);

            assert_eq!(stats.solo_meetings, 1);
            assert_eq!(stats.guest_meetings, 2);
            assert_eq!(stats.solo_meetings + stats.guest_meetings, stats.total_events);
        }

        #[test]
        fn average_is_not_rounded() {
            let events = [
                timed("a", utc(2025, 2, MON, 9, 0, 0), 10),
                timed("b", utc(2025, 2, MON, 10, 0, 0), 10),
                timed("c", utc(2025, 2, MON, 11, 0, 0), 11),
            ];
            let stats = aggregate_stats_in(&events, &Utc);

            assert_eq!(stats.total_duration, 31 * 60_000);
            assert_eq!(stats.average_duration, (31.0 * 60_000.0) / 3.0);
            assert_eq!(stats.total_duration_formatted, "31 minutes");
            assert_eq!(stats.average_duration_formatted, "10 minutes");
        }

        #[test]
        fn all_day_counts_as_a_day() {
            let events = [all_day("a", date(2025, 2, TUE))];
            let stats = aggregate_stats_in(&events, &Utc);

            assert_eq!(stats.total_duration, 86_400_000);
            assert_eq!(stats.total_duration_formatted, "24 hours");
        }

        #[test]
        fn negative_durations_pass_through() {
            let mut broken = timed("a", utc(2025, 2, MON, 10, 0, 0), 0);
            broken.duration_ms = -3_600_000;
            let events = [broken, timed("b", utc(2025, 2, MON, 11, 0, 0), 30)];
            let stats = aggregate_stats_in(&events, &Utc);

            assert_eq!(stats.total_duration, -1_800_000);
            assert_eq!(stats.total_duration_formatted, "0 minutes");
            assert_eq!(stats.average_duration_formatted, "0 minutes");
        }
    }

    mod busiest_day {
        use super::*;

        #[test]
        fn three_tuesdays_and_a_monday() {
            let events = [
                timed("a", utc(2025, 2, TUE, 9, 0, 0), 30),
                timed("b", utc(2025, 2, MON, 9, 0, 0), 30),
                timed("c", utc(2025, 2, TUE, 13, 0, 0), 30),
                timed("d", utc(2025, 2, TUE, 15, 0, 0), 30),
            ];
            let stats = aggregate_stats_in(&events, &Utc);
            assert_eq!(stats.busiest_day, BusiestDay { day: "Tuesday".into(), count: 3 });
        }

        #[test]
        fn tie_goes_to_first_seen_weekday() {
            let wed_first = [
                timed("a", utc(2025, 2, WED, 9, 0, 0), 30),
                timed("b", utc(2025, 2, MON, 9, 0, 0), 30),
                timed("c", utc(2025, 2, MON, 10, 0, 0), 30),
                timed("d", utc(2025, 2, WED, 10, 0, 0), 30),
            ];
            let stats = aggregate_stats_in(&wed_first, &Utc);
            assert_eq!(stats.busiest_day.day, "Wednesday");
            assert_eq!(stats.busiest_day.count, 2);

            let mon_first = [
                wed_first[1].clone(),
                wed_first[0].clone(),
                wed_first[2].clone(),
                wed_first[3].clone(),
            ];
            let stats = aggregate_stats_in(&mon_first, &Utc);
            assert_eq!(stats.busiest_day.day, "Monday");
        }

        #[test]
        fn weekday_uses_target_timezone() {
            // Monday 23:00 UTC is Tuesday in UTC+2.
            let events = [timed("a", utc(2025, 2, MON, 23, 0, 0), 30)];
            let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

            assert_eq!(aggregate_stats_in(&events, &Utc).busiest_day.day, "Monday");
            assert_eq!(aggregate_stats_in(&events, &plus_two).busiest_day.day, "Tuesday");
        }

        #[test]
        fn all_day_uses_calendar_date() {
            let events = [all_day("a", date(2025, 2, TUE))];
            let minus_eight = FixedOffset::west_opt(8 * 3600).unwrap();
            assert_eq!(aggregate_stats_in(&events, &minus_eight).busiest_day.day, "Tuesday");
        }

        #[test]
        fn sunday_is_named() {
            let events = [timed("a", utc(2025, 2, 9, 12, 0, 0), 30)];
            assert_eq!(aggregate_stats_in(&events, &Utc).busiest_day.day, "Sunday");
        }
    }

    mod properties {
        use super::*;

        fn sample() -> Vec<NormalizedEvent> {
            (0..20)
                .map(|i| {
                    let start = utc(2025, 2, 1, 8, 0, 0) + Duration::hours(i * 17);
                    let event = timed(&format!("e{i}"), start, 15 + i * 7);
                    if i % 3 == 0 {
                        event.with_attendees([format!("guest{i}@example.com")])
                    } else {
                        event
                    }
                })
                .collect()
        }

        #[test]
        fn totals_match_inputs() {
            let events = sample();
            let stats = aggregate_stats_in(&events, &Utc);

            assert_eq!(stats.total_events, events.len());
            assert_eq!(stats.solo_meetings + stats.guest_meetings, stats.total_events);
            assert_eq!(stats.total_duration, events.iter().map(|e| e.duration_ms).sum::<i64>());
            assert_eq!(
                stats.average_duration,
                stats.total_duration as f64 / stats.total_events as f64
            );
        }

        #[test]
        fn idempotent() {
            let events = sample();
            assert_eq!(aggregate_stats_in(&events, &Utc), aggregate_stats_in(&events, &Utc));
        }

        #[test]
        fn permutation_keeps_counts() {
            let events = sample();
            let mut reversed = events.clone();
            reversed.reverse();

            let a = aggregate_stats_in(&events, &Utc);
            let b = aggregate_stats_in(&reversed, &Utc);

            assert_eq!(a.total_events, b.total_events);
            assert_eq!(a.total_duration, b.total_duration);
            assert_eq!(a.solo_meetings, b.solo_meetings);
            assert_eq!(a.guest_meetings, b.guest_meetings);
            assert_eq!(a.busiest_day.count, b.busiest_day.count);
        }
    }

    #[test]
    fn local_timezone_entry_point() {
        let events = [timed("a", utc(2025, 2, WED, 12, 0, 0), 45)];
        let stats = aggregate_stats(&events);
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.busiest_day.count, 1);
    }
}
