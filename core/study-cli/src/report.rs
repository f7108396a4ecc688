//! `report` subcommand and the table renderers shared with the track menu.

use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use study_core::{
    PersistenceSink, Period, StorageBackend, StudyConfig, SubjectTotal, SummaryRow,
};

use crate::sinks;
use crate::StorageArgs;

const EMPTY_LOG: &str = "No study sessions recorded yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Date,
    Week,
    Month,
    Subject,
}

impl GroupBy {
    fn period(self) -> Option<Period> {
        match self {
            GroupBy::Date => Some(Period::Date),
            GroupBy::Week => Some(Period::Week),
            GroupBy::Month => Some(Period::Month),
            GroupBy::Subject => None,
        }
    }
}

pub fn run(
    config_path: Option<PathBuf>,
    storage: &StorageArgs,
    by: GroupBy,
    json: bool,
) -> Result<(), String> {
    let config = sinks::effective_config(config_path, storage)?;
    // Opening a sink creates its file, so a log that was never written is
    // reported as empty without touching the disk.
    let log_path = study_log_path(&config);
    if !log_path.exists() {
        tracing::debug!(path = %log_path.display(), "No study log yet");
        print!("{}", render_empty(json));
        return Ok(());
    }
    let sink = sinks::open_sink(&config, storage.user.as_deref())?;
    print!("{}", render(sink.as_ref(), by, json)?);
    Ok(())
}

fn study_log_path(config: &StudyConfig) -> &Path {
    match config.storage.backend {
        StorageBackend::Sqlite => &config.storage.sqlite_path,
        StorageBackend::Csv => &config.storage.csv_path,
    }
}

fn render_empty(json: bool) -> String {
    if json {
        "[]\n".to_string()
    } else {
        format!("{EMPTY_LOG}\n")
    }
}

/// Renders the requested aggregate from `sink` as a table or JSON.
pub fn render(sink: &dyn PersistenceSink, by: GroupBy, json: bool) -> Result<String, String> {
    let rendered = match by.period() {
        Some(period) => {
            let rows = sink.summarize(period)?;
            if json {
                to_json(&rows)?
            } else {
                render_summary(period, &rows)
            }
        }
        None => {
            let totals = sink.subject_totals()?;
            if json {
                to_json(&totals)?
            } else {
                render_totals(&totals)
            }
        }
    };
    Ok(rendered)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .map_err(|err| format!("Failed to encode report: {err}"))
}

pub fn render_summary(period: Period, rows: &[SummaryRow]) -> String {
    if rows.is_empty() {
        return format!("{EMPTY_LOG}\n");
    }
    let label_width = column_width(period.to_string().len(), rows.iter().map(|r| r.period.len()));
    let subject_width = column_width("subject".len(), rows.iter().map(|r| r.subject.len()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<label_width$}  {:<subject_width$}  {:>9}",
        period.to_string(),
        "subject",
        "minutes"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<label_width$}  {:<subject_width$}  {:>9.2}",
            row.period, row.subject, row.minutes
        );
    }
    out
}

pub fn render_totals(totals: &[SubjectTotal]) -> String {
    if totals.is_empty() {
        return format!("{EMPTY_LOG}\n");
    }
    let subject_width = column_width("subject".len(), totals.iter().map(|t| t.subject.len()));

    let mut out = String::new();
    let _ = writeln!(out, "{:<subject_width$}  {:>9}", "subject", "minutes");
    for total in totals {
        let _ = writeln!(
            out,
            "{:<subject_width$}  {:>9.2}",
            total.subject, total.minutes
        );
    }
    out
}

fn column_width(header: usize, values: impl Iterator<Item = usize>) -> usize {
    values.fold(header, usize::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::{MemorySink, StudyLogEntry, StudyStatus};

    fn entry(subject: &str, duration: f64, date: &str) -> StudyLogEntry {
        StudyLogEntry {
            filename: "notes.pdf".to_string(),
            subject: subject.to_string(),
            duration,
            status: StudyStatus::for_minutes(duration),
            start_time: format!("{date} 09:00:00"),
            end_time: format!("{date} 09:30:00"),
            date: date.to_string(),
            week: "2026-W10".to_string(),
            month: date[..7].to_string(),
            last_access_time: format!("{date} 09:35:00"),
        }
    }

    #[test]
    fn totals_table_aligns_columns() {
        let rendered = render_totals(&[
            SubjectTotal::new("Mathematics", 20.0),
            SubjectTotal::new("Art", 1.5),
        ]);
        assert_eq!(
            rendered,
            "subject        minutes\n\
             Mathematics      20.00\n\
             Art               1.50\n"
        );
    }

    #[test]
    fn summary_table_uses_period_header() {
        let rendered = render_summary(
            Period::Date,
            &[SummaryRow::new("2026-03-04", "Math", 2.5)],
        );
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("date        subject    minutes"));
        assert_eq!(lines.next(), Some("2026-03-04  Math          2.50"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_log_prints_placeholder() {
        assert_eq!(render_totals(&[]), format!("{EMPTY_LOG}\n"));
        assert_eq!(render_summary(Period::Week, &[]), format!("{EMPTY_LOG}\n"));
    }

    #[test]
    fn report_on_missing_log_creates_nothing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let db_path = temp_dir.path().join("data/study.db");
        let csv_path = temp_dir.path().join("data/study_log.csv");
        let config_path = temp_dir.path().join("config.toml");
        fs_err::write(
            &config_path,
            format!(
                "[storage]\nsqlite_path = {:?}\ncsv_path = {:?}\n",
                db_path.display().to_string(),
                csv_path.display().to_string()
            ),
        )
        .expect("write config");

        for backend in [StorageBackend::Sqlite, StorageBackend::Csv] {
            let storage = StorageArgs {
                user: Some("alice".to_string()),
                backend: Some(backend),
            };
            run(Some(config_path.clone()), &storage, GroupBy::Subject, false).expect("report");
        }
        assert!(!temp_dir.path().join("data").exists());
        assert_eq!(render_empty(true), "[]\n");
        assert_eq!(render_empty(false), format!("{EMPTY_LOG}\n"));
    }

    #[test]
    fn render_reads_through_the_sink() {
        let sink = MemorySink::new();
        sink.append(&entry("Math", 10.0, "2026-03-04")).expect("append");
        sink.append(&entry("Math", 5.0, "2026-03-05")).expect("append");
        sink.append(&entry("Art", 3.0, "2026-03-05")).expect("append");

        let table = render(&sink, GroupBy::Month, false).expect("render");
        assert!(table.contains("2026-03  Art           3.00"));
        assert!(table.contains("2026-03  Math         15.00"));

        let json = render(&sink, GroupBy::Subject, true).expect("render");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(parsed[0]["subject"], "Math");
        assert_eq!(parsed[0]["minutes"], 15.0);
    }
}
