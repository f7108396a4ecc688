//! Active-session state shared between the tracker and its readers.
//!
//! The tracker thread is the only writer. Readers get owned snapshots so a
//! `(start_time, last_fluctuation)` pair is always observed whole.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveSession {
    pub start_time: DateTime<Utc>,
    /// Never earlier than `start_time`.
    pub last_fluctuation: DateTime<Utc>,
}

impl ActiveSession {
    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            start_time: now,
            last_fluctuation: now,
        }
    }

    /// Minutes between the session start and its last fluctuation.
    pub fn studied_minutes(&self) -> f64 {
        minutes_between(self.start_time, self.last_fluctuation)
    }

    /// Minutes elapsed from the session start until `now`.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> f64 {
        minutes_between(self.start_time, now)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_fluctuation {
            self.last_fluctuation = now;
        }
    }
}

pub(crate) fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    end.signed_duration_since(start).num_milliseconds() as f64 / 60_000.0
}

/// Outcome of recording a fluctuation against the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fluctuation {
    Started,
    Continued,
    /// The table is sealed, so no new session was opened.
    Ignored,
}

/// Mutex-guarded map of path to active session.
///
/// Cloning is cheap and yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct SessionTable {
    inner: Arc<Mutex<Table>>,
}

#[derive(Debug, Default)]
struct Table {
    open: HashMap<PathBuf, ActiveSession>,
    /// Set on shutdown; existing sessions still update but none start.
    sealed: bool,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of every active session.
    pub fn snapshot(&self) -> HashMap<PathBuf, ActiveSession> {
        self.lock().open.clone()
    }

    /// Active sessions ordered by start time, oldest first.
    pub fn sorted_snapshot(&self) -> Vec<(PathBuf, ActiveSession)> {
        let mut sessions: Vec<_> = self.snapshot().into_iter().collect();
        sessions.sort_by(|(left_path, left), (right_path, right)| {
            left.start_time
                .cmp(&right.start_time)
                .then_with(|| left_path.cmp(right_path))
        });
        sessions
    }

    pub fn get(&self, path: &Path) -> Option<ActiveSession> {
        self.lock().open.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().open.is_empty()
    }

    pub(crate) fn record_fluctuation(&self, path: &Path, now: DateTime<Utc>) -> Fluctuation {
        let mut table = self.lock();
        if let Some(session) = table.open.get_mut(path) {
            session.touch(now);
            return Fluctuation::Continued;
        }
        if table.sealed {
            return Fluctuation::Ignored;
        }
        table
            .open
            .insert(path.to_path_buf(), ActiveSession::started_at(now));
        Fluctuation::Started
    }

    /// Removes and returns every session idle for longer than `threshold`.
    pub(crate) fn take_expired(
        &self,
        now: DateTime<Utc>,
        threshold: chrono::Duration,
    ) -> Vec<(PathBuf, ActiveSession)> {
        let mut table = self.lock();
        let expired: Vec<PathBuf> = table
            .open
            .iter()
            .filter(|(_, session)| now.signed_duration_since(session.last_fluctuation) > threshold)
            .map(|(path, _)| path.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|path| table.open.remove(&path).map(|session| (path, session)))
            .collect()
    }

    pub(crate) fn remove(&self, path: &Path) -> Option<ActiveSession> {
        self.lock().open.remove(path)
    }

    pub(crate) fn drain(&self) -> Vec<(PathBuf, ActiveSession)> {
        self.lock().open.drain().collect()
    }

    /// Stops new sessions from starting. Sessions already open are unaffected.
    pub(crate) fn seal(&self) {
        self.lock().sealed = true;
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        // A panic mid-update cannot leave a half-written entry: every
        // mutation is a single insert/remove or a field store.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
