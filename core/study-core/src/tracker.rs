//! Session inference from access-time fluctuations.
//!
//! Each poll compares a fresh catalog snapshot with the previous one:
//!
//! - a path seen for the first time only establishes a baseline;
//! - a changed access time is a fluctuation, which opens a session or keeps
//!   an open one alive;
//! - a session idle for longer than the inactivity threshold is closed;
//! - a path missing from the snapshot closes its session immediately.
//!
//! Closed sessions long enough to count are written to the sink and
//! announced through the notifier. Neither failing stops the sweep.
//!
//! Access times only move when the filesystem records them. On volumes
//! mounted `noatime` (or `relatime`, the usual Linux default) reads may not
//! register, and sessions will rarely or never start.

use chrono::{DateTime, Utc};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::catalog::{CatalogSnapshot, CatalogSource};
use crate::config::TrackerConfig;
use crate::entry::StudyLogEntry;
use crate::notifier::{self, EventNotifier};
use crate::session::{minutes_between, ActiveSession, Fluctuation, SessionTable};
use crate::sink::PersistenceSink;

/// Grace period callers should give the tracker thread on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// No fluctuation within the inactivity threshold.
    Inactive,
    /// The file disappeared from the catalog.
    Removed,
    /// The tracker was shut down with the session still open.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Persisted,
    /// Shorter than the learning threshold; dropped without a log entry.
    BelowThreshold,
    PersistFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedSession {
    pub path: PathBuf,
    pub session: ActiveSession,
    pub end_time: DateTime<Utc>,
    pub reason: CloseReason,
    pub outcome: CloseOutcome,
}

impl ClosedSession {
    pub fn minutes(&self) -> f64 {
        minutes_between(self.session.start_time, self.end_time)
    }
}

/// What a single poll cycle did. Path lists are sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    pub discovered: Vec<PathBuf>,
    pub started: Vec<PathBuf>,
    pub continued: Vec<PathBuf>,
    pub closed: Vec<ClosedSession>,
}

impl PollReport {
    pub fn is_quiet(&self) -> bool {
        self.discovered.is_empty()
            && self.started.is_empty()
            && self.continued.is_empty()
            && self.closed.is_empty()
    }

    pub fn persisted(&self) -> usize {
        self.closed
            .iter()
            .filter(|closed| closed.outcome == CloseOutcome::Persisted)
            .count()
    }

    fn sort(&mut self) {
        self.discovered.sort();
        self.started.sort();
        self.continued.sort();
        self.closed.sort_by(|left, right| left.path.cmp(&right.path));
    }
}

/// Turns a terminated session into a log entry and a notification.
#[derive(Clone)]
struct SessionCloser {
    sink: Arc<dyn PersistenceSink>,
    notifier: Arc<dyn EventNotifier>,
    learning_threshold_minutes: f64,
}

impl SessionCloser {
    fn close(
        &self,
        path: &Path,
        session: ActiveSession,
        reason: CloseReason,
        end_time: DateTime<Utc>,
        logged_at: DateTime<Utc>,
    ) -> ClosedSession {
        let minutes = minutes_between(session.start_time, end_time);
        let outcome = if minutes < self.learning_threshold_minutes {
            debug!(
                path = %path.display(),
                minutes,
                reason = ?reason,
                "Session below learning threshold; discarded"
            );
            CloseOutcome::BelowThreshold
        } else {
            let entry = StudyLogEntry::from_session(path, session.start_time, end_time, logged_at);
            let outcome = match self.sink.append(&entry) {
                Ok(()) => CloseOutcome::Persisted,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        sink = self.sink.name(),
                        error = %err,
                        "Failed to persist study session"
                    );
                    CloseOutcome::PersistFailed
                }
            };
            info!(
                path = %path.display(),
                minutes = entry.duration,
                subject = %entry.subject,
                reason = ?reason,
                "Study session stopped"
            );
            self.announce(close_title(reason), &close_message(path, reason, minutes));
            outcome
        };

        ClosedSession {
            path: path.to_path_buf(),
            session,
            end_time,
            reason,
            outcome,
        }
    }

    fn announce(&self, title: &str, message: &str) {
        if let Err(err) = self.notifier.notify(title, message) {
            warn!(error = %err, title, "Notification failed");
        }
    }
}

fn close_title(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::Inactive => notifier::STUDY_STOPPED,
        CloseReason::Removed => notifier::FILE_REMOVED,
        CloseReason::Shutdown => notifier::STOPPED_ON_EXIT,
    }
}

fn close_message(path: &Path, reason: CloseReason, minutes: f64) -> String {
    let name = display_name(path);
    match reason {
        CloseReason::Inactive => format!("Stopped studying {name} after {minutes:.2} minutes"),
        CloseReason::Removed => {
            format!("{name} was removed or moved after {minutes:.2} minutes of study")
        }
        CloseReason::Shutdown => {
            format!("Stopped studying {name} on exit after {minutes:.2} minutes")
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Polling state machine over a [`CatalogSource`].
pub struct SessionTracker<S: CatalogSource> {
    config: TrackerConfig,
    source: S,
    known: CatalogSnapshot,
    sessions: SessionTable,
    closer: SessionCloser,
}

impl<S: CatalogSource> SessionTracker<S> {
    /// Creates a tracker and records the current snapshot as its baseline,
    /// so files present at start-up are never mistaken for fluctuations.
    pub fn new(
        config: TrackerConfig,
        source: S,
        sink: Arc<dyn PersistenceSink>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        let known = source.scan();
        debug!(
            root = %config.root_dir.display(),
            files = known.len(),
            "Catalog baseline recorded"
        );
        let closer = SessionCloser {
            sink,
            notifier,
            learning_threshold_minutes: config.learning_threshold_minutes,
        };
        Self {
            config,
            source,
            known,
            sessions: SessionTable::new(),
            closer,
        }
    }

    /// Read handle over the live session map.
    pub fn sessions(&self) -> SessionTable {
        self.sessions.clone()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of files currently remembered from the last scan.
    pub fn tracked_files(&self) -> usize {
        self.known.len()
    }

    /// Runs one poll cycle as if the wall clock read `now`.
    pub fn poll_once(&mut self, now: DateTime<Utc>) -> PollReport {
        let current = self.source.scan();
        let mut report = PollReport::default();

        for (path, accessed) in &current {
            match self.known.insert(path.clone(), *accessed) {
                None => {
                    debug!(path = %path.display(), "New file detected");
                    report.discovered.push(path.clone());
                }
                Some(previous) if previous != *accessed => {
                    match self.sessions.record_fluctuation(path, now) {
                        Fluctuation::Started => {
                            info!(path = %path.display(), "Study session started");
                            self.closer.announce(
                                notifier::STUDY_STARTED,
                                &format!("Started studying {}", display_name(path)),
                            );
                            report.started.push(path.clone());
                        }
                        Fluctuation::Continued => {
                            trace!(path = %path.display(), "Study session continued");
                            report.continued.push(path.clone());
                        }
                        Fluctuation::Ignored => {
                            debug!(path = %path.display(), "Shutting down; not starting session");
                        }
                    }
                }
                Some(_) => {}
            }
        }

        let expired = self
            .sessions
            .take_expired(now, self.config.inactivity_threshold());
        for (path, session) in expired {
            report.closed.push(self.closer.close(
                &path,
                session,
                CloseReason::Inactive,
                session.last_fluctuation,
                now,
            ));
        }

        let removed: Vec<PathBuf> = self
            .known
            .keys()
            .filter(|path| !current.contains_key(*path))
            .cloned()
            .collect();
        for path in removed {
            self.known.remove(&path);
            debug!(path = %path.display(), "Tracked file disappeared");
            if let Some(session) = self.sessions.remove(&path) {
                report.closed.push(self.closer.close(
                    &path,
                    session,
                    CloseReason::Removed,
                    session.last_fluctuation,
                    now,
                ));
            }
        }

        report.sort();
        report
    }

    /// Closes every open session as of `now`. Used on shutdown.
    pub fn finalize(&self, now: DateTime<Utc>) -> Vec<ClosedSession> {
        finalize_sessions(&self.sessions, &self.closer, now)
    }
}

fn finalize_sessions(
    sessions: &SessionTable,
    closer: &SessionCloser,
    now: DateTime<Utc>,
) -> Vec<ClosedSession> {
    let mut closed: Vec<_> = sessions
        .drain()
        .into_iter()
        .map(|(path, session)| closer.close(&path, session, CloseReason::Shutdown, now, now))
        .collect();
    closed.sort_by(|left, right| left.path.cmp(&right.path));
    closed
}

impl<S: CatalogSource + 'static> SessionTracker<S> {
    /// Spawns the polling thread.
    pub fn start(self) -> std::io::Result<TrackerHandle> {
        let stop = Arc::new(StopSignal::default());
        let sessions = self.sessions.clone();
        let closer = self.closer.clone();
        let (done_tx, done_rx) = mpsc::channel();

        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("study-tracker".to_string())
            .spawn(move || {
                self.run(&thread_stop);
                let _ = done_tx.send(());
            })?;

        Ok(TrackerHandle {
            stop,
            sessions,
            closer,
            done: done_rx,
            thread: Some(thread),
        })
    }

    fn run(mut self, stop: &StopSignal) {
        let interval = self.config.poll_interval();
        info!(
            root = %self.config.root_dir.display(),
            interval_secs = interval.as_secs(),
            files = self.known.len(),
            "Study tracker started"
        );

        while !stop.is_requested() {
            let cycle = panic::catch_unwind(AssertUnwindSafe(|| self.poll_once(Utc::now())));
            match cycle {
                Ok(report) if !report.is_quiet() => debug!(
                    discovered = report.discovered.len(),
                    started = report.started.len(),
                    closed = report.closed.len(),
                    persisted = report.persisted(),
                    "Poll cycle complete"
                ),
                Ok(_) => {}
                Err(payload) => error!(
                    panic = %panic_message(payload.as_ref()),
                    "Poll cycle panicked; continuing"
                ),
            }
            stop.wait_timeout(interval);
        }

        info!("Study tracker stopped");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Cooperative stop flag whose wait wakes as soon as stop is requested.
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub fn request(&self) {
        *self.lock() = true;
        self.wake.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        *self.lock()
    }

    /// Sleeps up to `timeout`; returns true if stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, timeout, |requested| !*requested)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.requested
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    /// False when the thread outlived the grace period.
    pub thread_exited: bool,
    pub closed: Vec<ClosedSession>,
}

/// Owner-side handle of a running tracker thread.
pub struct TrackerHandle {
    stop: Arc<StopSignal>,
    sessions: SessionTable,
    closer: SessionCloser,
    done: mpsc::Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl TrackerHandle {
    pub fn sessions(&self) -> SessionTable {
        self.sessions.clone()
    }

    pub fn request_stop(&self) {
        self.stop.request();
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Stops the thread, waiting at most `grace`, then closes whatever
    /// sessions are still open.
    ///
    /// Stop interrupts the inter-poll sleep, so the wait is normally bounded
    /// by one in-flight scan. A thread that does not exit in time is left
    /// behind with a warning; the table is sealed first, so its last poll can
    /// extend a session but cannot open one that would never be persisted.
    pub fn shutdown(mut self, grace: Duration) -> ShutdownReport {
        self.sessions.seal();
        self.request_stop();

        let thread_exited = match self.done.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };

        if thread_exited {
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    warn!("Study tracker thread panicked");
                }
            }
        } else {
            warn!(
                grace_secs = grace.as_secs_f64(),
                "Study tracker did not stop within grace period; forcing shutdown"
            );
        }

        let closed = finalize_sessions(&self.sessions, &self.closer, Utc::now());
        if !closed.is_empty() {
            info!(
                closed = closed.len(),
                persisted = closed
                    .iter()
                    .filter(|session| session.outcome == CloseOutcome::Persisted)
                    .count(),
                "Finalized sessions on shutdown"
            );
        }

        ShutdownReport {
            thread_exited,
            closed,
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.stop.request();
    }
}
