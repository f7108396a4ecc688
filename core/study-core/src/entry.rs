//! Study log entries derived from terminated sessions.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::session::minutes_between;

/// Sessions at or above this many minutes are marked completed.
pub const COMPLETED_THRESHOLD_MINUTES: f64 = 15.0;
pub const UNKNOWN_SUBJECT: &str = "unknown";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStatus {
    Completed,
    InProgress,
}

impl StudyStatus {
    pub fn for_minutes(minutes: f64) -> Self {
        if minutes >= COMPLETED_THRESHOLD_MINUTES {
            StudyStatus::Completed
        } else {
            StudyStatus::InProgress
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StudyStatus::Completed => "completed",
            StudyStatus::InProgress => "in_progress",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(StudyStatus::Completed),
            "in_progress" => Some(StudyStatus::InProgress),
            _ => None,
        }
    }
}

impl fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted study interval. Field order matches the CSV header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyLogEntry {
    pub filename: String,
    pub subject: String,
    /// Minutes, rounded to two decimals.
    pub duration: f64,
    pub status: StudyStatus,
    pub start_time: String,
    pub end_time: String,
    pub date: String,
    pub week: String,
    pub month: String,
    pub last_access_time: String,
}

impl StudyLogEntry {
    /// Builds the entry for a session on `path` that ran from `start` to
    /// `end`, logged at `logged_at`.
    ///
    /// Calendar labels come from `logged_at`; status uses the unrounded
    /// duration.
    pub fn from_session(
        path: &Path,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        logged_at: DateTime<Utc>,
    ) -> Self {
        Self::from_session_in(path, start, end, logged_at, &Local)
    }

    /// Same as [`StudyLogEntry::from_session`] with an explicit timezone for
    /// the formatted fields.
    pub fn from_session_in<Tz: TimeZone>(
        path: &Path,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        logged_at: DateTime<Utc>,
        tz: &Tz,
    ) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        let minutes = minutes_between(start, end);
        let logged = logged_at.with_timezone(tz);

        Self {
            filename: file_name(path),
            subject: subject_for(path),
            duration: round_minutes(minutes),
            status: StudyStatus::for_minutes(minutes),
            start_time: start.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
            end_time: end.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
            date: logged.format("%Y-%m-%d").to_string(),
            week: logged.format("%G-W%V").to_string(),
            month: logged.format("%Y-%m").to_string(),
            last_access_time: logged.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Parent directory name of `path`, or [`UNKNOWN_SUBJECT`].
pub fn subject_for(path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

pub(crate) fn round_minutes(minutes: f64) -> f64 {
    (minutes * 100.0).round() / 100.0
}
