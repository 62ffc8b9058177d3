//! Human-readable labels for due dates.
//!
//! All labels are rendered in the due-date zone and carry a fixed "PST"
//! suffix, also during daylight saving time.

use chrono::{DateTime, NaiveDateTime, Utc, Weekday};

use crate::calendar::{self, CalendarCell, WeekStart};
use crate::clock;
use crate::types::parse_timestamp;

/// `Mar 15, 2024 at 2:30 PM PST`
pub fn due_date_label(instant: DateTime<Utc>) -> String {
    clock::to_local(instant)
        .format("%b %-d, %Y at %-I:%M %p PST")
        .to_string()
}

/// Label for a stored due-date string; `None` when unset or unreadable
pub fn committed_label(committed: Option<&str>) -> Option<String> {
    committed
        .and_then(|s| parse_timestamp(s).ok())
        .map(due_date_label)
}

/// `March 2024`
pub fn month_title(working: NaiveDateTime) -> String {
    working.format("%B %Y").to_string()
}

/// `2:30 PM PST`
pub fn time_label(working: NaiveDateTime) -> String {
    working.format("%-I:%M %p PST").to_string()
}

/// Time of an instant on the first line, the full date on the second:
/// `2:30 PM PST\nFriday, March 15, 2024`
pub fn full_stamp(instant: DateTime<Utc>) -> String {
    let local = clock::to_local(instant);
    format!(
        "{}\n{}",
        local.format("%-I:%M %p PST"),
        local.format("%A, %B %-d, %Y")
    )
}

/// Only the time part of [`full_stamp`]
pub fn short_stamp(instant: DateTime<Utc>) -> String {
    clock::to_local(instant).format("%-I:%M %p PST").to_string()
}

/// Two-letter weekday label
pub fn weekday_min(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Su",
        Weekday::Mon => "Mo",
        Weekday::Tue => "Tu",
        Weekday::Wed => "We",
        Weekday::Thu => "Th",
        Weekday::Fri => "Fr",
        Weekday::Sat => "Sa",
    }
}

/// Column headers for a grid starting on `week_start`
pub fn weekday_headers(week_start: WeekStart) -> [&'static str; 7] {
    week_start.columns().map(weekday_min)
}

/// Zero-padded label for an hour or minute option
pub fn two_digits(n: u32) -> String {
    format!("{n:02}")
}

/// Plain-text month grid for terminals.
///
/// Days outside the month are left blank, the selected day is bracketed and
/// today carries a trailing `*`.
pub fn text_grid(title: &str, cells: &[CalendarCell], week_start: WeekStart) -> String {
    let header: String = weekday_headers(week_start)
        .iter()
        .map(|label| format!("{label:>3} "))
        .collect();
    let width = header.trim_end().len();

    let mut lines = vec![
        format!("{title:^width$}").trim_end().to_string(),
        header.trim_end().to_string(),
    ];
    for week in calendar::weeks(cells) {
        let line: String = week
            .iter()
            .map(|cell| {
                let day = chrono::Datelike::day(&cell.date);
                if !cell.is_current_month {
                    "    ".to_string()
                } else if cell.is_selected {
                    format!("[{day:>2}]")
                } else if cell.is_today {
                    format!("{day:>3}*")
                } else {
                    format!("{day:>3} ")
                }
            })
            .collect();
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn local(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_due_date_label() {
        assert_eq!(
            due_date_label(utc(2024, 3, 15, 21, 30)),
            "Mar 15, 2024 at 2:30 PM PST"
        );
    }

    #[test]
    fn test_due_date_label_morning_in_winter() {
        assert_eq!(
            due_date_label(utc(2024, 1, 5, 17, 5)),
            "Jan 5, 2024 at 9:05 AM PST"
        );
    }

    #[test]
    fn test_due_date_label_uses_pacific_day() {
        // Midnight UTC is the previous afternoon in Los Angeles
        assert_eq!(
            due_date_label(utc(2024, 7, 1, 0, 0)),
            "Jun 30, 2024 at 5:00 PM PST"
        );
    }

    #[test]
    fn test_committed_label() {
        assert_eq!(
            committed_label(Some("2024-06-01T09:00:00Z")).as_deref(),
            Some("Jun 1, 2024 at 2:00 AM PST")
        );
        assert_eq!(committed_label(None), None);
        assert_eq!(committed_label(Some("bogus")), None);
    }

    #[test]
    fn test_month_title() {
        assert_eq!(month_title(local("2023-12-10 09:00")), "December 2023");
    }

    #[test]
    fn test_time_label() {
        assert_eq!(time_label(local("2024-03-15 00:07")), "12:07 AM PST");
        assert_eq!(time_label(local("2024-03-15 12:00")), "12:00 PM PST");
        assert_eq!(time_label(local("2024-03-15 23:59")), "11:59 PM PST");
    }

    #[test]
    fn test_full_stamp() {
        assert_eq!(
            full_stamp(utc(2024, 3, 15, 21, 30)),
            "2:30 PM PST\nFriday, March 15, 2024"
        );
        assert_eq!(short_stamp(utc(2024, 3, 15, 21, 30)), "2:30 PM PST");
    }

    #[test]
    fn test_weekday_headers() {
        assert_eq!(
            weekday_headers(WeekStart::Sunday),
            ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"]
        );
        assert_eq!(
            weekday_headers(WeekStart::Monday),
            ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"]
        );
    }

    #[test]
    fn test_text_grid() {
        let d = chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let cells = calendar::month_grid(d, today, d, WeekStart::Sunday);
        let text = text_grid("June 2024", &cells, WeekStart::Sunday);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0].trim(), "June 2024");
        assert_eq!(lines[1], " Su  Mo  Tu  We  Th  Fr  Sa");
        assert_eq!(lines[2], "                          1");
        assert_eq!(lines[3], "  2   3*  4   5   6   7   8");
        assert_eq!(lines[4], "  9  10  11  12  13  14 [15]");
        assert_eq!(lines[7], " 30");
    }

    #[test]
    fn test_two_digits() {
        assert_eq!(two_digits(0), "00");
        assert_eq!(two_digits(7), "07");
        assert_eq!(two_digits(59), "59");
    }
}
