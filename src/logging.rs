//! Diagnostic logging
//!
//! Installs a `log` backend that stamps every record with local wall-clock
//! time, echoes it to stderr and keeps the most recent lines in a bounded
//! ring. The ring backs the on-page diagnostic region.

use std::collections::VecDeque;
use std::sync::LazyLock;

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::RwLock;

/// Default number of diagnostic lines retained
pub const DEFAULT_LOG_LINES: usize = 40;

/// Process-wide diagnostic ring
pub static DIAGNOSTICS: LazyLock<DiagnosticLog> =
    LazyLock::new(|| DiagnosticLog::new(DEFAULT_LOG_LINES));

static LOGGER: DiagnosticLogger = DiagnosticLogger;

/// Severity labels as rendered in the diagnostic region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Map a `log` record level onto a diagnostic severity
    pub fn from_level(level: Level) -> Self {
        match level {
            Level::Error => LogLevel::Error,
            Level::Warn => LogLevel::Warning,
            Level::Info => LogLevel::Info,
            Level::Debug | Level::Trace => LogLevel::Debug,
        }
    }

    /// Upper-case prefix used in formatted lines
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

struct RingInner {
    lines: VecDeque<String>,
    max_lines: usize,
}

/// Bounded ring of formatted diagnostic lines; oldest lines are evicted first.
pub struct DiagnosticLog {
    inner: RwLock<RingInner>,
}

impl DiagnosticLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            inner: RwLock::new(RingInner {
                lines: VecDeque::with_capacity(max_lines),
                max_lines: max_lines.max(1),
            }),
        }
    }

    /// Append an already formatted line
    pub fn push(&self, line: String) {
        let mut inner = self.inner.write();
        inner.lines.push_back(line);
        while inner.lines.len() > inner.max_lines {
            inner.lines.pop_front();
        }
    }

    /// Format and append a message at the given severity
    pub fn record(&self, level: LogLevel, message: &str) -> String {
        let line = format_line(&Local::now().format("%H:%M:%S").to_string(), level, message);
        self.push(line.clone());
        line
    }

    /// Change capacity, trimming the oldest lines if needed
    pub fn set_max_lines(&self, max_lines: usize) {
        let mut inner = self.inner.write();
        inner.max_lines = max_lines.max(1);
        while inner.lines.len() > inner.max_lines {
            inner.lines.pop_front();
        }
    }

    pub fn max_lines(&self) -> usize {
        self.inner.read().max_lines
    }

    /// Snapshot of the retained lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.inner.read().lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().lines.is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().lines.clear();
    }
}

impl std::fmt::Debug for DiagnosticLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("DiagnosticLog")
            .field("max_lines", &inner.max_lines)
            .field("lines", &inner.lines.len())
            .finish()
    }
}

/// `[HH:MM:SS] [LEVEL] message`
pub fn format_line(timestamp: &str, level: LogLevel, message: &str) -> String {
    format!("[{}] [{}] {}", timestamp, level.label(), message)
}

struct DiagnosticLogger;

impl Log for DiagnosticLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        let line = DIAGNOSTICS.record(LogLevel::from_level(record.level()), &message);
        eprintln!("{}", line);
    }

    fn flush(&self) {}
}

/// Initialize the logging system
///
/// Safe to call more than once; only the first call installs the logger,
/// later calls just adjust capacity and level.
pub fn log_init(max_lines: usize, level: LevelFilter) {
    DIAGNOSTICS.set_max_lines(max_lines);
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_level_from_level() {
        assert_eq!(LogLevel::from_level(Level::Error), LogLevel::Error);
        assert_eq!(LogLevel::from_level(Level::Warn), LogLevel::Warning);
        assert_eq!(LogLevel::from_level(Level::Info), LogLevel::Info);
        assert_eq!(LogLevel::from_level(Level::Trace), LogLevel::Debug);
    }

    #[test]
    fn test_format_line() {
        assert_eq!(
            format_line("12:00:01", LogLevel::Error, "boom"),
            "[12:00:01] [ERROR] boom"
        );
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let ring = DiagnosticLog::new(3);
        for i in 0..5 {
            ring.push(format!("line {}", i));
        }
        assert_eq!(ring.lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_ring_shrink_trims() {
        let ring = DiagnosticLog::new(10);
        for i in 0..6 {
            ring.push(format!("{}", i));
        }
        ring.set_max_lines(2);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.lines(), vec!["4", "5"]);
    }

    #[test]
    fn test_record_is_timestamped() {
        let ring = DiagnosticLog::new(4);
        let line = ring.record(LogLevel::Info, "hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("[INFO] hello"));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    #[serial]
    fn test_global_logger_captures_records() {
        log_init(DEFAULT_LOG_LINES, LevelFilter::Debug);
        DIAGNOSTICS.clear();
        log::warn!("placeholder detected for {}", "HELLO");
        let lines = DIAGNOSTICS.lines();
        assert!(lines
            .iter()
            .any(|l| l.ends_with("[WARN] placeholder detected for HELLO")));
    }

    #[test]
    #[serial]
    fn test_global_ring_capped() {
        log_init(DEFAULT_LOG_LINES, LevelFilter::Info);
        DIAGNOSTICS.clear();
        for i in 0..60 {
            log::info!("entry {}", i);
        }
        assert_eq!(DIAGNOSTICS.len(), DEFAULT_LOG_LINES);
        assert!(!DIAGNOSTICS
            .lines()
            .iter()
            .any(|l| l.ends_with("[INFO] entry 0")));
    }
}
