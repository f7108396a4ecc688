use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, UNIX_EPOCH};
use study_core::{
    CatalogSnapshot, CatalogSource, CloseReason, MemorySink, PersistenceSink, SessionTable,
    SessionTracker, SilentNotifier, TrackerConfig,
};

const CHAPTER: &str = "/courseware/Math/chapter1.pdf";

/// Reports a single document whose access time moves on every scan.
#[derive(Clone, Default)]
struct BusyReader {
    scans: Arc<AtomicU64>,
    panic_on_scan: Option<u64>,
    slow: Arc<AtomicBool>,
}

impl CatalogSource for BusyReader {
    fn scan(&self) -> CatalogSnapshot {
        let scan = self.scans.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_scan == Some(scan) {
            panic!("scripted scan failure");
        }
        if self.slow.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_secs(2));
        }
        HashMap::from([(
            PathBuf::from(CHAPTER),
            UNIX_EPOCH + Duration::from_secs(1_000 + scan),
        )])
    }
}

fn config(poll_interval_secs: u64) -> TrackerConfig {
    TrackerConfig {
        poll_interval_secs,
        learning_threshold_minutes: 0.0,
        ..TrackerConfig::for_root("/courseware")
    }
}

fn wait_for_session(sessions: &SessionTable, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !sessions.is_empty() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn readers_see_consistent_sessions_while_tracker_runs() {
    let sink = Arc::new(MemorySink::new());
    let tracker = SessionTracker::new(
        config(1),
        BusyReader::default(),
        sink.clone(),
        Arc::new(SilentNotifier),
    );
    let handle = tracker.start().expect("spawn tracker");
    assert!(wait_for_session(&handle.sessions(), Duration::from_secs(5)));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let sessions = handle.sessions();
            thread::spawn(move || {
                for _ in 0..200 {
                    for (_, session) in sessions.snapshot() {
                        assert!(session.start_time <= session.last_fluctuation);
                    }
                    thread::sleep(Duration::from_millis(2));
                }
            })
        })
        .collect();
    for reader in readers {
        reader.join().expect("reader thread");
    }

    let report = handle.shutdown(Duration::from_secs(5));
    assert!(report.thread_exited);
    assert_eq!(report.closed.len(), 1);
    assert_eq!(report.closed[0].reason, CloseReason::Shutdown);
    assert_eq!(report.closed[0].path, PathBuf::from(CHAPTER));
    assert_eq!(sink.entries().expect("entries").len(), 1);
}

#[test]
fn stop_interrupts_a_long_poll_interval() {
    let tracker = SessionTracker::new(
        config(60),
        BusyReader::default(),
        Arc::new(MemorySink::new()),
        Arc::new(SilentNotifier),
    );
    let handle = tracker.start().expect("spawn tracker");
    thread::sleep(Duration::from_millis(100));
    assert!(handle.is_running());

    let started = Instant::now();
    let report = handle.shutdown(Duration::from_secs(5));

    assert!(report.thread_exited);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn shutdown_gives_up_after_grace_period() {
    let source = BusyReader::default();
    let slow = Arc::clone(&source.slow);
    let sink = Arc::new(MemorySink::new());
    let tracker = SessionTracker::new(
        config(1),
        source,
        sink.clone(),
        Arc::new(SilentNotifier),
    );
    slow.store(true, Ordering::SeqCst);
    let handle = tracker.start().expect("spawn tracker");
    let sessions = handle.sessions();
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let report = handle.shutdown(Duration::from_millis(100));

    assert!(!report.thread_exited);
    assert!(report.closed.is_empty());
    assert!(started.elapsed() < Duration::from_secs(1));

    // The abandoned scan finishes with a moved access time, after the
    // table was drained. It must not leave an unpersisted session behind.
    thread::sleep(Duration::from_secs(3));
    assert!(sessions.is_empty());
    assert!(sink.entries().expect("entries").is_empty());
}

#[test]
fn a_panicking_scan_does_not_stop_tracking() {
    let source = BusyReader {
        // Scan 0 is the baseline; the first poll panics.
        panic_on_scan: Some(1),
        ..BusyReader::default()
    };
    let sink = Arc::new(MemorySink::new());
    let tracker = SessionTracker::new(
        config(1),
        source,
        sink.clone(),
        Arc::new(SilentNotifier),
    );
    let handle = tracker.start().expect("spawn tracker");

    assert!(wait_for_session(&handle.sessions(), Duration::from_secs(6)));
    assert!(handle.is_running());

    let report = handle.shutdown(Duration::from_secs(5));
    assert!(report.thread_exited);
    assert_eq!(sink.entries().expect("entries").len(), 1);
}
