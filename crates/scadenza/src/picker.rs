//! Due-date picker edit state
//!
//! The picker keeps a working copy of the due date while it is open. Only
//! [`DueDatePicker::commit`] and [`DueDatePicker::clear`] reach the issue
//! store, through an [`IssueUpdater`]; every other transition is local.
//!
//! The working date is wall-clock time in [`DUE_DATE_TZ`](crate::clock::DUE_DATE_TZ)
//! at minute precision.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calendar::{self, CalendarCell, WeekStart};
use crate::clock::{self, Clock};
use crate::types::{parse_timestamp, DueDatePatch};

/// Receives the partial update produced by commit and clear.
///
/// The picker does not wait on or inspect the outcome; implementations own
/// their own failure reporting.
pub trait IssueUpdater {
    fn update_issue(&mut self, patch: DueDatePatch);
}

impl<F: FnMut(DueDatePatch)> IssueUpdater for F {
    fn update_issue(&mut self, patch: DueDatePatch) {
        self(patch)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickerError {
    #[error("time {hour:02}:{minute:02} is out of range")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("the due date picker is not open")]
    NotOpen,

    #[error("there is no due date to clear")]
    NothingToClear,

    #[error("date {0} is outside the supported range")]
    DateOutOfRange(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PickerState {
    #[default]
    Closed,
    Open {
        working: NaiveDateTime,
        /// Offset the working date was seeded with, used to pick an occurrence
        /// of a repeated fall-back hour on commit
        #[serde(skip)]
        offset: FixedOffset,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DueDatePicker {
    state: PickerState,
    week_start: WeekStart,
}

impl DueDatePicker {
    pub fn new(week_start: WeekStart) -> Self {
        Self {
            state: PickerState::Closed,
            week_start,
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PickerState::Open { .. })
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// The date being edited, if the picker is open
    pub fn working(&self) -> Option<NaiveDateTime> {
        match self.state {
            PickerState::Open { working, .. } => Some(working),
            PickerState::Closed => None,
        }
    }

    fn working_mut(&mut self) -> Result<&mut NaiveDateTime, PickerError> {
        match &mut self.state {
            PickerState::Open { working, .. } => Ok(working),
            PickerState::Closed => Err(PickerError::NotOpen),
        }
    }

    /// Open the picker, seeding the working date from `committed`.
    ///
    /// An absent committed value starts from the current moment. A malformed
    /// or out-of-range one is logged and treated the same way. Opening an
    /// already open picker starts a fresh edit.
    pub fn open(&mut self, committed: Option<&str>, clock: &dyn Clock) -> NaiveDateTime {
        let seed = match committed.map(parse_timestamp) {
            Some(Ok(instant)) if calendar::is_supported(clock::to_local(instant).date()) => {
                instant
            }
            Some(Ok(instant)) => {
                warn!(due_date = %instant, "Due date out of range, starting from now");
                clock.now()
            }
            Some(Err(e)) => {
                warn!(error = %e, "Ignoring unreadable due date, starting from now");
                clock.now()
            }
            None => clock.now(),
        };
        let working = clock::truncate_to_minute(clock::to_local(seed));
        let offset = clock::offset_at(seed);

        debug!(working = %working, %offset, "Picker opened");
        self.state = PickerState::Open { working, offset };
        working
    }

    /// Move the working date by `delta` months, clamping the day of month.
    /// Leaving the supported years is an error and keeps the working date.
    pub fn navigate_month(&mut self, delta: i32) -> Result<NaiveDateTime, PickerError> {
        let working = self.working_mut()?;
        let shifted = calendar::shift_months(*working, delta);
        if !calendar::is_supported(shifted.date()) {
            return Err(PickerError::DateOutOfRange(shifted.date()));
        }
        *working = shifted;
        debug!(working = %working, delta, "Navigated month");
        Ok(*working)
    }

    pub fn previous_month(&mut self) -> Result<NaiveDateTime, PickerError> {
        self.navigate_month(-1)
    }

    pub fn next_month(&mut self) -> Result<NaiveDateTime, PickerError> {
        self.navigate_month(1)
    }

    /// Replace the date part of the working date, keeping its time
    pub fn select_day(&mut self, date: NaiveDate) -> Result<NaiveDateTime, PickerError> {
        if !calendar::is_supported(date) {
            return Err(PickerError::DateOutOfRange(date));
        }
        let working = self.working_mut()?;
        *working = date.and_time(working.time());
        debug!(working = %working, "Selected day");
        Ok(*working)
    }

    /// Replace the time of day. Out-of-range input leaves the working date untouched.
    pub fn set_time(&mut self, hour: u32, minute: u32) -> Result<NaiveDateTime, PickerError> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(PickerError::InvalidTime { hour, minute })?;
        let working = self.working_mut()?;
        *working = working.date().and_time(time);
        debug!(working = %working, "Set time");
        Ok(*working)
    }

    pub fn set_hour(&mut self, hour: u32) -> Result<NaiveDateTime, PickerError> {
        let minute = self.working().ok_or(PickerError::NotOpen)?.minute();
        self.set_time(hour, minute)
    }

    pub fn set_minute(&mut self, minute: u32) -> Result<NaiveDateTime, PickerError> {
        let hour = self.working().ok_or(PickerError::NotOpen)?.hour();
        self.set_time(hour, minute)
    }

    /// Send the working date to `updater` and close.
    ///
    /// The picker closes right away whatever the update's eventual outcome.
    pub fn commit<U: IssueUpdater + ?Sized>(
        &mut self,
        updater: &mut U,
    ) -> Result<DueDatePatch, PickerError> {
        let PickerState::Open { working, offset } = self.state else {
            return Err(PickerError::NotOpen);
        };
        let patch = DueDatePatch::set(clock::to_utc(working, Some(offset)));

        debug!(working = %working, due_date = ?patch.due_date, "Committing due date");
        updater.update_issue(patch.clone());
        self.state = PickerState::Closed;
        Ok(patch)
    }

    /// Drop the working date without touching the issue. Returns whether the
    /// picker was open.
    pub fn cancel(&mut self) -> bool {
        let was_open = self.is_open();
        self.state = PickerState::Closed;
        if was_open {
            debug!("Picker cancelled");
        }
        was_open
    }

    /// Remove the committed due date and close. Allowed whether or not the
    /// picker is open, as long as there is something to clear.
    pub fn clear<U: IssueUpdater + ?Sized>(
        &mut self,
        committed: Option<&str>,
        updater: &mut U,
    ) -> Result<DueDatePatch, PickerError> {
        if committed.is_none() {
            return Err(PickerError::NothingToClear);
        }

        let patch = DueDatePatch::clear();
        debug!("Clearing due date");
        updater.update_issue(patch.clone());
        self.state = PickerState::Closed;
        Ok(patch)
    }

    /// Month grid around the working date, `None` while closed
    pub fn grid(&self, clock: &dyn Clock) -> Option<Vec<CalendarCell>> {
        let working = self.working()?;
        let date = working.date();
        Some(calendar::month_grid(date, clock.today(), date, self.week_start))
    }
}
