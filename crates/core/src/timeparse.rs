//! Date and time resolution for messenger-style inputs.
//!
//! Inputs arrive as day-of-month plus hour (and optional minute) with no
//! year or month: "27일 11시" means the next 27th at 11:00. Resolution is
//! anchored to a caller-supplied `now` so the rollover rule is testable.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::CoreError;

/// Resolve a day/hour/minute triple against `now`'s month, rolling to the
/// next month when the instant has already passed. Invalid combinations
/// (Feb 30, hour 25) are `InvalidInput`.
pub fn resolve_day_hour(
    now: NaiveDateTime,
    day: u32,
    hour: u32,
    minute: u32,
) -> Result<NaiveDateTime, CoreError> {
    let build = |year: i32, month: u32| {
        NaiveDate::from_ymd_opt(year, month, day).and_then(|date| date.and_hms_opt(hour, minute, 0))
    };

    let candidate = build(now.year(), now.month()).ok_or_else(|| {
        CoreError::InvalidInput(format!("invalid date: {day}일 {hour}시 {minute}분"))
    })?;

    if candidate >= now {
        return Ok(candidate);
    }

    // Past instant: the user meant the same day next month.
    let (year, month) =
        if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
    build(year, month)
        .ok_or_else(|| CoreError::InvalidInput(format!("{month}월에는 {day}일이 없습니다")))
}

/// Half-open range covering one hour: `[h:00:00, h+1:00:00)`. A slot at
/// `h:59:59` matches; one at `(h+1):00:00` does not.
pub fn hour_range(start: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (start, start + Duration::hours(1))
}

/// "11월 27일 11시" / "11월 27일 11시 30분".
pub fn format_short(at: NaiveDateTime) -> String {
    if at.minute() == 0 {
        format!("{}월 {}일 {}시", at.month(), at.day(), at.hour())
    } else {
        format!("{}월 {}일 {}시 {}분", at.month(), at.day(), at.hour(), at.minute())
    }
}

/// "4시간" / "4시간 30분" / "30분".
pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, rest) => format!("{rest}분"),
        (hours, 0) => format!("{hours}시간"),
        (hours, rest) => format!("{hours}시간 {rest}분"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{format_duration, format_short, hour_range, resolve_day_hour};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid fixture datetime")
    }

    #[test]
    fn future_day_resolves_in_current_month() {
        let now = at(2024, 6, 10, 8, 0, 0);
        let resolved = resolve_day_hour(now, 27, 11, 0).expect("resolve");
        assert_eq!(resolved, at(2024, 6, 27, 11, 0, 0));
    }

    #[test]
    fn past_day_rolls_to_next_month() {
        let now = at(2024, 6, 10, 8, 0, 0);
        let resolved = resolve_day_hour(now, 3, 11, 0).expect("resolve");
        assert_eq!(resolved, at(2024, 7, 3, 11, 0, 0));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let now = at(2024, 12, 20, 8, 0, 0);
        let resolved = resolve_day_hour(now, 5, 9, 30).expect("resolve");
        assert_eq!(resolved, at(2025, 1, 5, 9, 30, 0));
    }

    #[test]
    fn nonexistent_rollover_day_is_invalid() {
        // Jan 30 exists but Feb 30 does not.
        let now = at(2025, 1, 31, 12, 0, 0);
        assert!(resolve_day_hour(now, 30, 9, 0).is_err());
    }

    #[test]
    fn out_of_range_hour_is_invalid() {
        let now = at(2024, 6, 10, 8, 0, 0);
        assert!(resolve_day_hour(now, 15, 24, 0).is_err());
        assert!(resolve_day_hour(now, 15, 9, 60).is_err());
    }

    #[test]
    fn hour_range_is_half_open() {
        let start = at(2024, 6, 1, 9, 0, 0);
        let (lo, hi) = hour_range(start);
        assert!(at(2024, 6, 1, 9, 0, 0) >= lo);
        assert!(at(2024, 6, 1, 9, 59, 59) < hi);
        assert!(at(2024, 6, 1, 10, 0, 0) >= hi);
    }

    #[test]
    fn short_format_omits_zero_minutes() {
        assert_eq!(format_short(at(2024, 11, 27, 11, 0, 0)), "11월 27일 11시");
        assert_eq!(format_short(at(2024, 11, 27, 11, 30, 0)), "11월 27일 11시 30분");
    }

    #[test]
    fn duration_format_covers_all_shapes() {
        assert_eq!(format_duration(240), "4시간");
        assert_eq!(format_duration(270), "4시간 30분");
        assert_eq!(format_duration(45), "45분");
    }
}
