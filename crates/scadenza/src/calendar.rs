//! Month grid generation for the due-date picker
//!
//! The grid always covers whole weeks: it starts on the configured first
//! weekday on or before the 1st of the month and ends on the last day of the
//! week containing the month's last day.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, Weekday};
use std::ops::RangeInclusive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One day tile in the month grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
}

/// First day of the week shown in the leftmost column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// The seven weekdays in column order
    pub fn columns(self) -> [Weekday; 7] {
        let mut day = self.weekday();
        let mut out = [day; 7];
        for slot in out.iter_mut().skip(1) {
            day = day.succ();
            *slot = day;
        }
        out
    }

    /// Zero-based column index of `day` in the grid
    pub fn column_of(self, day: Weekday) -> u32 {
        (day.num_days_from_sunday() + 7 - self.weekday().num_days_from_sunday()) % 7
    }
}

impl FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            other => Err(format!("unknown week start '{other}' (expected sunday or monday)")),
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekStart::Sunday => f.write_str("sunday"),
            WeekStart::Monday => f.write_str("monday"),
        }
    }
}

/// Years a working date may fall in. Committed timestamps are ISO-8601 with
/// four-digit years, and late December in Pacific time can already be the
/// next year in UTC.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1..=9998;

pub fn is_supported(date: NaiveDate) -> bool {
    SUPPORTED_YEARS.contains(&date.year())
}

/// First day of the month containing `date`
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`
pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    (28..=31)
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(date.year(), date.month(), day))
        .unwrap_or(date)
}

/// Number of days in the month containing `date`
#[cfg(test)]
pub fn days_in_month(date: NaiveDate) -> u32 {
    last_of_month(date).day()
}

/// Move `dt` by `delta` months, keeping the time of day.
///
/// The day of month is clamped to the target month's length, so Jan 31 plus
/// one month is Feb 28 (or 29), never Mar 2. Returns `dt` unchanged if the
/// result would leave chrono's supported range.
pub fn shift_months(dt: NaiveDateTime, delta: i32) -> NaiveDateTime {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        dt.checked_add_months(months)
    } else {
        dt.checked_sub_months(months)
    };
    shifted.unwrap_or(dt)
}

/// Build the grid for the month containing `reference`.
///
/// `today` and `selected` are dates already normalized to the due-date zone.
/// The result length is always a multiple of seven. It is empty for the first
/// and last months chrono can represent, whose weeks run past its range.
pub fn month_grid(
    reference: NaiveDate,
    today: NaiveDate,
    selected: NaiveDate,
    week_start: WeekStart,
) -> Vec<CalendarCell> {
    let first = first_of_month(reference);
    let last = last_of_month(reference);

    let lead = week_start.column_of(first.weekday());
    let trail = 6 - week_start.column_of(last.weekday());

    let (Some(start), Some(end)) = (
        first.checked_sub_days(Days::new(u64::from(lead))),
        last.checked_add_days(Days::new(u64::from(trail))),
    ) else {
        return Vec::new();
    };

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| CalendarCell {
            date,
            is_current_month: date.year() == reference.year()
                && date.month() == reference.month(),
            is_today: date == today,
            is_selected: date == selected,
        })
        .collect()
}

/// Split a grid into week rows
pub fn weeks(cells: &[CalendarCell]) -> impl Iterator<Item = &[CalendarCell]> {
    cells.chunks(7)
}
