use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Naive layouts the issue API has been seen to emit. They carry no offset and
/// are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A timestamp string that could not be read
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed timestamp '{0}'")]
pub struct TimestampError(pub String);

/// Parse an ISO-8601 timestamp into an absolute instant.
///
/// Strings with an offset are honoured; naive strings are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError(s.to_string()))
}

/// Serialize an instant the way the update endpoint expects it:
/// UTC, millisecond precision, `Z` suffix.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// An issue as far as due-date editing is concerned
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,

    pub title: String,

    /// Committed due date as an ISO-8601 string, `None` when unset
    pub due_date: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

impl Issue {
    pub fn new(title: String, due_date: Option<String>, now: DateTime<Utc>) -> Self {
        let stamp = format_timestamp(now);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            due_date,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }

    /// Committed due date as an instant. A malformed stored value reads as unset.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(|s| parse_timestamp(s).ok())
    }

    /// Whether the issue was touched meaningfully after creation, i.e. more
    /// than one whole minute separates the two stamps.
    pub fn was_updated(&self) -> bool {
        match (parse_timestamp(&self.created_at), parse_timestamp(&self.updated_at)) {
            (Ok(created), Ok(updated)) => (updated - created).num_minutes() > 1,
            _ => false,
        }
    }
}

/// Partial update sent to the issue store: `{ "dueDate": "<iso>" | null }`
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DueDatePatch {
    pub due_date: Option<String>,
}

impl DueDatePatch {
    pub fn set(at: DateTime<Utc>) -> Self {
        Self {
            due_date: Some(format_timestamp(at)),
        }
    }

    pub fn clear() -> Self {
        Self { due_date: None }
    }
}
