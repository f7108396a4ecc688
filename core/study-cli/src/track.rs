//! `track` subcommand: runs the tracker thread and a line-oriented menu.
//!
//! The menu loop owns shutdown. Quitting, EOF on stdin and Ctrl-C all lead to
//! [`TrackerHandle::shutdown`], which finalizes any open sessions.

use chrono::{DateTime, Local, Utc};
use std::fmt::Write as _;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use study_core::storage::expand_tilde;
use study_core::{
    notifier_from_settings, ActiveSession, FileCatalog, SessionTracker, StudyError,
    TrackerHandle, DEFAULT_SHUTDOWN_GRACE,
};

use crate::{report, signal, sinks, StorageArgs};

const INPUT_POLL: Duration = Duration::from_millis(200);
const MENU: &str = "Commands: [s]essions  [r]eport  [q]uit";

pub struct TrackOptions {
    pub config: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub headless: bool,
    pub storage: StorageArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuCommand {
    Sessions,
    Report,
    Quit,
}

impl MenuCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "s" | "sessions" => Some(MenuCommand::Sessions),
            "r" | "report" => Some(MenuCommand::Report),
            "q" | "quit" | "exit" => Some(MenuCommand::Quit),
            _ => None,
        }
    }
}

pub fn run(options: TrackOptions) -> Result<(), String> {
    let mut config = sinks::effective_config(options.config, &options.storage)?;
    if let Some(root) = options.root {
        config.tracker.root_dir = expand_tilde(&root);
    }
    config.validate()?;
    if !config.tracker.root_dir.is_dir() {
        tracing::warn!(
            root = %config.tracker.root_dir.display(),
            "Courseware directory does not exist yet; waiting for files"
        );
    }

    let sink = sinks::open_sink(&config, options.storage.user.as_deref())?;
    let tracker = SessionTracker::new(
        config.tracker.clone(),
        FileCatalog::new(config.tracker.clone()),
        sink.clone(),
        notifier_from_settings(&config.notifications),
    );
    let handle = tracker.start().map_err(|source| StudyError::Io {
        context: "spawning tracker thread".to_string(),
        source,
    })?;
    signal::install();

    println!(
        "Tracking {} (log: {})",
        config.tracker.root_dir.display(),
        sink.name()
    );
    let commands = if options.headless {
        println!("Press Ctrl-C to stop.");
        None
    } else {
        println!("{MENU}");
        Some(spawn_stdin_reader())
    };

    loop {
        if signal::interrupted() {
            tracing::info!("Interrupted; stopping tracker");
            break;
        }
        let Some(commands) = &commands else {
            thread::sleep(INPUT_POLL);
            continue;
        };
        match commands.recv_timeout(INPUT_POLL) {
            Ok(line) => match MenuCommand::parse(&line) {
                Some(MenuCommand::Sessions) => {
                    print!("{}", render_sessions(&handle, Utc::now()));
                }
                Some(MenuCommand::Report) => match report::render(
                    sink.as_ref(),
                    report::GroupBy::Subject,
                    false,
                ) {
                    Ok(table) => print!("{table}"),
                    Err(err) => tracing::warn!(error = %err, "Failed to build report"),
                },
                Some(MenuCommand::Quit) => break,
                None if line.trim().is_empty() => {}
                None => println!("Unknown command '{}'. {MENU}", line.trim()),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Input closed; stopping tracker");
                break;
            }
        }
    }

    let report = handle.shutdown(DEFAULT_SHUTDOWN_GRACE);
    if !report.closed.is_empty() {
        println!("Finalized {} open session(s).", report.closed.len());
    }
    Ok(())
}

/// Forwards stdin lines over a channel; the channel closes on EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stdin-menu".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        // The sender was dropped with the closure, so the loop sees EOF.
        tracing::warn!(error = %err, "Failed to start input reader");
    }
    rx
}

fn render_sessions(handle: &TrackerHandle, now: DateTime<Utc>) -> String {
    format_sessions(&handle.sessions().sorted_snapshot(), now)
}

fn format_sessions(sessions: &[(PathBuf, ActiveSession)], now: DateTime<Utc>) -> String {
    if sessions.is_empty() {
        return "No active study sessions.\n".to_string();
    }
    let mut out = String::new();
    for (path, session) in sessions {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let started = session.start_time.with_timezone(&Local).format("%H:%M:%S");
        let _ = writeln!(
            out,
            "{name} ({}) since {started}, {:.2} min",
            study_core::subject_for(path),
            session.elapsed_minutes(now)
        );
    }
    out
}
