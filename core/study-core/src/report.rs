//! Aggregate queries over persisted study log entries.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::entry::{round_minutes, StudyLogEntry};

/// Calendar bucket used to group entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Date,
    Week,
    Month,
}

impl Period {
    fn label<'a>(&self, entry: &'a StudyLogEntry) -> &'a str {
        match self {
            Period::Date => &entry.date,
            Period::Week => &entry.week,
            Period::Month => &entry.month,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Date => "date",
            Period::Week => "week",
            Period::Month => "month",
        })
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "date" | "day" | "daily" => Ok(Period::Date),
            "week" | "weekly" => Ok(Period::Week),
            "month" | "monthly" => Ok(Period::Month),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub period: String,
    pub subject: String,
    pub minutes: f64,
}

impl SummaryRow {
    pub fn new(period: impl Into<String>, subject: impl Into<String>, minutes: f64) -> Self {
        Self {
            period: period.into(),
            subject: subject.into(),
            minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectTotal {
    pub subject: String,
    pub minutes: f64,
}

impl SubjectTotal {
    pub fn new(subject: impl Into<String>, minutes: f64) -> Self {
        Self {
            subject: subject.into(),
            minutes,
        }
    }
}

/// Sums minutes per (period label, subject), ordered by period then subject.
pub fn summarize(entries: &[StudyLogEntry], period: Period) -> Vec<SummaryRow> {
    let mut totals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for entry in entries {
        *totals
            .entry((period.label(entry), entry.subject.as_str()))
            .or_default() += entry.duration;
    }
    totals
        .into_iter()
        .map(|((label, subject), minutes)| SummaryRow::new(label, subject, round_minutes(minutes)))
        .collect()
}

/// Sums minutes per subject, largest total first.
pub fn subject_totals(entries: &[StudyLogEntry]) -> Vec<SubjectTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in entries {
        *totals.entry(entry.subject.as_str()).or_default() += entry.duration;
    }
    let mut rows: Vec<_> = totals
        .into_iter()
        .map(|(subject, minutes)| SubjectTotal::new(subject, round_minutes(minutes)))
        .collect();
    rows.sort_by(|left, right| {
        right
            .minutes
            .total_cmp(&left.minutes)
            .then_with(|| left.subject.cmp(&right.subject))
    });
    rows
}
