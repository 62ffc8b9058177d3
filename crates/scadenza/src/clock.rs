//! Time source and the zone all due dates are displayed and edited in.

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

/// Due dates are always shown and edited in Pacific time, whatever the
/// viewer's own zone is.
pub const DUE_DATE_TZ: Tz = chrono_tz::America::Los_Angeles;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current wall-clock time in [`DUE_DATE_TZ`]
    fn local_now(&self) -> NaiveDateTime {
        to_local(self.now())
    }

    /// Today's date in [`DUE_DATE_TZ`]
    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Backs the `--now` option.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Convert an absolute instant to wall-clock time in [`DUE_DATE_TZ`]
pub fn to_local(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&DUE_DATE_TZ).naive_local()
}

/// UTC offset in effect in [`DUE_DATE_TZ`] at `instant`
pub fn offset_at(instant: DateTime<Utc>) -> FixedOffset {
    instant.with_timezone(&DUE_DATE_TZ).offset().fix()
}

/// Convert wall-clock time in [`DUE_DATE_TZ`] back to an absolute instant.
///
/// Times inside the spring-forward gap are moved one hour later. Times in the
/// fall-back overlap resolve to the occurrence whose offset is `prefer`, and to
/// the earlier one when `prefer` matches neither.
pub fn to_utc(local: NaiveDateTime, prefer: Option<FixedOffset>) -> DateTime<Utc> {
    let resolved = match DUE_DATE_TZ.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(early, late) => {
            if prefer == Some(late.offset().fix()) {
                Some(late)
            } else {
                Some(early)
            }
        }
        LocalResult::None => local
            .checked_add_signed(chrono::Duration::hours(1))
            .and_then(|later| DUE_DATE_TZ.from_local_datetime(&later).earliest()),
    };

    match resolved {
        Some(dt) => dt.with_timezone(&Utc),
        // No zone rule skips more than an hour; fall back to the standard offset.
        None => local
            .checked_add_signed(chrono::Duration::hours(8))
            .unwrap_or(local)
            .and_utc(),
    }
}

/// Drop seconds and sub-second precision
pub fn truncate_to_minute(local: NaiveDateTime) -> NaiveDateTime {
    local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn local(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_to_local_summer_is_pdt() {
        let dt = to_local(utc("2024-06-01T09:00:00Z"));
        assert_eq!(dt, local("2024-06-01 02:00"));
    }

    #[test]
    fn test_to_local_winter_is_pst() {
        let dt = to_local(utc("2024-01-15T20:00:00Z"));
        assert_eq!(dt, local("2024-01-15 12:00"));
    }

    #[test]
    fn test_to_local_crosses_day_boundary() {
        // Early morning UTC is still the previous evening in Los Angeles
        let dt = to_local(utc("2024-03-01T03:00:00Z"));
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_to_utc_roundtrip() {
        let instant = utc("2024-03-15T21:30:00Z");
        assert_eq!(to_utc(to_local(instant), None), instant);
    }

    #[test]
    fn test_to_utc_spring_forward_gap_moves_later() {
        // 2:30 AM does not exist on 2024-03-10 in Los Angeles
        let dt = to_utc(local("2024-03-10 02:30"), None);
        assert_eq!(dt, utc("2024-03-10T10:30:00Z"));
        assert_eq!(to_local(dt), local("2024-03-10 03:30"));
    }

    #[test]
    fn test_to_utc_fall_back_overlap_takes_earlier() {
        // 1:30 AM happens twice on 2024-11-03; first occurrence is PDT
        let dt = to_utc(local("2024-11-03 01:30"), None);
        assert_eq!(dt, utc("2024-11-03T08:30:00Z"));
    }

    #[test]
    fn test_to_utc_fall_back_overlap_honours_preferred_offset() {
        let first = utc("2024-11-03T08:30:00Z");
        let second = utc("2024-11-03T09:30:00Z");
        assert_eq!(to_local(first), to_local(second));

        let wall = local("2024-11-03 01:30");
        assert_eq!(to_utc(wall, Some(offset_at(first))), first);
        assert_eq!(to_utc(wall, Some(offset_at(second))), second);
    }

    #[test]
    fn test_preferred_offset_ignored_outside_overlap() {
        let pst = offset_at(utc("2024-01-15T20:00:00Z"));
        assert_eq!(pst.local_minus_utc(), -8 * 3600);
        // A summer time keeps its PDT offset whatever offset is preferred
        assert_eq!(
            to_utc(local("2024-06-01 02:00"), Some(pst)),
            utc("2024-06-01T09:00:00Z")
        );
    }

    #[test]
    fn test_to_utc_at_end_of_range_does_not_overflow() {
        let last = NaiveDate::MAX.and_hms_opt(23, 59, 0).unwrap();
        let first = NaiveDate::MIN.and_hms_opt(0, 0, 0).unwrap();
        to_utc(last, None);
        to_utc(first, None);
    }

    #[test]
    fn test_truncate_to_minute() {
        let dt = NaiveDateTime::parse_from_str("2024-03-15 14:30:59.250", "%Y-%m-%d %H:%M:%S%.3f")
            .unwrap();
        assert_eq!(truncate_to_minute(dt), local("2024-03-15 14:30"));
    }

    #[test]
    fn test_fixed_clock_today_uses_due_date_zone() {
        let clock = FixedClock(utc("2024-07-04T05:00:00Z"));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 7, 3).unwrap());
    }
}
