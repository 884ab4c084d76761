use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use chrono_tz::Tz;

/// Parse an upstream timestamp (RFC 3339 with offset) and convert it to the
/// target zone. All day-bucketing and time-of-day formatting must go through
/// this conversion before comparison, otherwise events near midnight land in
/// the wrong grid cell.
pub fn zoned_instant(value: &str, tz: Tz) -> Option<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|instant| instant.with_timezone(&tz))
}

/// Format a zoned instant as a clock time, e.g. "6:30 PM"
pub fn format_clock<T: TimeZone>(instant: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    instant.format("%-I:%M %p").to_string()
}

/// First day of the month the given instant falls in
pub fn first_of_month<T: TimeZone>(instant: &DateTime<T>) -> NaiveDate {
    NaiveDate::from_ymd_opt(instant.year(), instant.month(), 1)
        .unwrap_or_else(|| instant.date_naive())
}

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    match (next, NaiveDate::from_ymd_opt(year, month, 1)) {
        (Some(next), Some(first)) => next.signed_duration_since(first).num_days() as u32,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Chicago;

    #[test]
    fn converts_to_target_zone() {
        // 04:30 UTC is 23:30 the previous evening in Chicago (CDT)
        let instant = zoned_instant("2024-04-01T04:30:00+00:00", Chicago).unwrap();
        assert_eq!(instant.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(zoned_instant("tomorrow-ish", Chicago).is_none());
        assert!(zoned_instant("", Chicago).is_none());
    }

    #[test]
    fn formats_clock_without_padding() {
        let instant = zoned_instant("2024-03-14T18:05:00-05:00", Chicago).unwrap();
        assert_eq!(format_clock(&instant), "6:05 PM");
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2026, 3), 31);
        assert_eq!(days_in_month(2026, 12), 31);
    }
}
