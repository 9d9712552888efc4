/*!
 * In-memory capture of engine log lines.
 *
 * Every entry is forwarded to the `log` facade as well, so the terminal
 * logger keeps working while the controller can dump a per-file log.
 */

use std::sync::Arc;

use log::Level;
use parking_lot::Mutex;

/// Log entry for capturing translation process logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
}

/// Shared, cloneable sink for engine log entries
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    // Forward non-error entries at debug level (a progress bar owns the terminal)
    quiet: bool,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture that only forwards errors above debug level
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    /// Record an entry and forward it to the global logger
    pub fn push(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        let forward_level = if self.quiet && level != Level::Error { Level::Debug } else { level };
        log::log!(target: "cuelingo::engine", forward_level, "{}", message);
        self.entries.lock().push(LogEntry {
            level: level.to_string(),
            message,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(Level::Warn, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.push(Level::Debug, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    /// Copy of everything captured so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Number of entries at the given level
    pub fn count(&self, level: Level) -> usize {
        let wanted = level.to_string();
        self.entries.lock().iter().filter(|e| e.level == wanted).count()
    }

    /// Render the captured entries one per line
    pub fn render(&self) -> String {
        self.entries
            .lock()
            .iter()
            .map(|e| format!("[{}] {}", e.level, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
