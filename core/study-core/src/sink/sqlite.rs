//! SQLite persistence for study logs and the user directory.
//!
//! Every call opens its own connection, so `StudyDb` is freely shareable
//! across threads; WAL plus a busy timeout keeps the tracker's writes and a
//! reporting thread's reads from tripping over each other.

use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};

use super::PersistenceSink;
use crate::entry::{StudyLogEntry, StudyStatus};
use crate::error::{Result, StudyError};
use crate::report::{Period, SubjectTotal, SummaryRow};

#[derive(Debug, Clone)]
pub struct StudyDb {
    path: PathBuf,
}

impl StudyDb {
    pub fn new(path: PathBuf) -> Result<Self> {
        let db = Self { path };
        db.init_schema()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert_log(&self, user_id: Option<i64>, entry: &StudyLogEntry) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO study_logs (\
                    user_id, filename, subject, duration, status, \
                    start_time, end_time, date, week, month, last_access_time) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    user_id,
                    entry.filename,
                    entry.subject,
                    entry.duration,
                    entry.status.as_str(),
                    entry.start_time,
                    entry.end_time,
                    entry.date,
                    entry.week,
                    entry.month,
                    entry.last_access_time
                ],
            )
            .map_err(StudyError::sqlite("inserting study log"))?;
            Ok(())
        })
    }

    pub fn list_logs(&self, user_id: Option<i64>) -> Result<Vec<StudyLogEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT filename, subject, duration, status, start_time, end_time, \
                            date, week, month, last_access_time \
                     FROM study_logs WHERE user_id IS ?1 ORDER BY id ASC",
                )
                .map_err(StudyError::sqlite("preparing study log query"))?;

            let rows = stmt
                .query_map(params![user_id], entry_from_row)
                .map_err(StudyError::sqlite("reading study log rows"))?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row.map_err(StudyError::sqlite("decoding study log row"))?);
            }
            Ok(entries)
        })
    }

    pub fn summarize_logs(&self, user_id: Option<i64>, period: Period) -> Result<Vec<SummaryRow>> {
        let column = period_column(period);
        let sql = format!(
            "SELECT {column}, subject, SUM(duration) FROM study_logs \
             WHERE user_id IS ?1 GROUP BY {column}, subject ORDER BY {column} ASC, subject ASC"
        );
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(StudyError::sqlite("preparing summary query"))?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(SummaryRow {
                        period: row.get(0)?,
                        subject: row.get(1)?,
                        minutes: crate::entry::round_minutes(row.get(2)?),
                    })
                })
                .map_err(StudyError::sqlite("reading summary rows"))?;

            let mut summary = Vec::new();
            for row in rows {
                summary.push(row.map_err(StudyError::sqlite("decoding summary row"))?);
            }
            Ok(summary)
        })
    }

    pub fn subject_totals(&self, user_id: Option<i64>) -> Result<Vec<SubjectTotal>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT subject, SUM(duration) AS total FROM study_logs \
                     WHERE user_id IS ?1 GROUP BY subject ORDER BY total DESC, subject ASC",
                )
                .map_err(StudyError::sqlite("preparing subject totals query"))?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(SubjectTotal {
                        subject: row.get(0)?,
                        minutes: crate::entry::round_minutes(row.get(1)?),
                    })
                })
                .map_err(StudyError::sqlite("reading subject totals"))?;

            let mut totals = Vec::new();
            for row in rows {
                totals.push(row.map_err(StudyError::sqlite("decoding subject total"))?);
            }
            Ok(totals)
        })
    }

    fn init_schema(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(
                "BEGIN;
                 CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT UNIQUE NOT NULL,
                    email TEXT,
                    theme TEXT NOT NULL DEFAULT 'Light'
                 );
                 CREATE TABLE IF NOT EXISTS study_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER,
                    filename TEXT NOT NULL,
                    subject TEXT NOT NULL,
                    duration REAL NOT NULL,
                    status TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT NOT NULL,
                    date TEXT NOT NULL,
                    week TEXT NOT NULL,
                    month TEXT NOT NULL,
                    last_access_time TEXT NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES users(id)
                 );
                 CREATE INDEX IF NOT EXISTS idx_study_logs_user ON study_logs(user_id);
                 COMMIT;",
            )
            .map_err(StudyError::sqlite("initializing schema"))
        })
    }

    pub(crate) fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.open()?;
        op(&mut conn)
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)
                .map_err(StudyError::io("creating database directory"))?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(StudyError::sqlite(format!("opening {}", self.path.display())))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(StudyError::sqlite("enabling WAL"))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(StudyError::sqlite("setting synchronous"))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(StudyError::sqlite("setting busy_timeout"))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(StudyError::sqlite("enabling foreign keys"))?;

        Ok(conn)
    }
}

fn period_column(period: Period) -> &'static str {
    match period {
        Period::Date => "date",
        Period::Week => "week",
        Period::Month => "month",
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<StudyLogEntry> {
    let status: String = row.get(3)?;
    Ok(StudyLogEntry {
        filename: row.get(0)?,
        subject: row.get(1)?,
        duration: row.get(2)?,
        status: StudyStatus::parse(&status).unwrap_or(StudyStatus::InProgress),
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        date: row.get(6)?,
        week: row.get(7)?,
        month: row.get(8)?,
        last_access_time: row.get(9)?,
    })
}

/// [`PersistenceSink`] writing to [`StudyDb`] on behalf of one user.
///
/// `user_id` of `None` stores rows without an owner (single-user mode).
#[derive(Debug, Clone)]
pub struct SqliteSink {
    db: StudyDb,
    user_id: Option<i64>,
}

impl SqliteSink {
    pub fn new(db: StudyDb, user_id: Option<i64>) -> Self {
        Self { db, user_id }
    }

    pub fn db(&self) -> &StudyDb {
        &self.db
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }
}

impl PersistenceSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn append(&self, entry: &StudyLogEntry) -> Result<()> {
        self.db.insert_log(self.user_id, entry)
    }

    fn entries(&self) -> Result<Vec<StudyLogEntry>> {
        self.db.list_logs(self.user_id)
    }

    fn summarize(&self, period: Period) -> Result<Vec<SummaryRow>> {
        self.db.summarize_logs(self.user_id, period)
    }

    fn subject_totals(&self) -> Result<Vec<SubjectTotal>> {
        self.db.subject_totals(self.user_id)
    }
}
