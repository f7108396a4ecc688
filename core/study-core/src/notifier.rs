//! Best-effort notifications for session lifecycle events.
//!
//! Delivery failures are logged by the caller and never affect tracking.

use std::io::Write;
use std::sync::Arc;

use crate::config::{NotificationMode, NotificationSettings};
use crate::error::NotifyError;

pub const STUDY_STARTED: &str = "Study started";
pub const STUDY_STOPPED: &str = "Study stopped";
pub const FILE_REMOVED: &str = "File removed";
pub const STOPPED_ON_EXIT: &str = "Stopped on exit";

pub trait EventNotifier: Send + Sync {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Emits notifications as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl EventNotifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(title, "{}", message);
        Ok(())
    }
}

/// Prints one line per notification to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl EventNotifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "[{title}] {message}").map_err(|err| NotifyError(err.to_string()))
    }
}

/// Drops every notification. Used when notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl EventNotifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Builds the notifier selected by configuration.
pub fn notifier_from_settings(settings: &NotificationSettings) -> Arc<dyn EventNotifier> {
    if !settings.enabled {
        return Arc::new(SilentNotifier);
    }
    match settings.mode {
        NotificationMode::Log => Arc::new(LogNotifier),
        NotificationMode::Console => Arc::new(ConsoleNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_notifiers_accept_every_event() {
        for title in [STUDY_STARTED, STUDY_STOPPED, FILE_REMOVED, STOPPED_ON_EXIT] {
            LogNotifier.notify(title, "chapter1.pdf").expect("log notifier");
            SilentNotifier.notify(title, "chapter1.pdf").expect("silent notifier");
        }
    }

    #[test]
    fn settings_select_a_working_notifier() {
        let disabled = NotificationSettings {
            enabled: false,
            mode: NotificationMode::Console,
        };
        let log = NotificationSettings {
            enabled: true,
            mode: NotificationMode::Log,
        };
        for settings in [disabled, log] {
            notifier_from_settings(&settings)
                .notify(STUDY_STARTED, "chapter1.pdf")
                .expect("notify");
        }
    }
}
