use std::sync::Mutex;

use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Keeps every line in memory. Used by tests and by the terminal demo to echo
/// warnings next to the chat log.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the collected lines.
    #[must_use]
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// True if any line at `level` or above contains `needle`.
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, text)| *l >= level && text.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, msg: &str, _target: &'static str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, msg.to_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_respects_level_floor() {
        let sink = MemoryLogSink::new();
        sink.log(LogLevel::Debug, "state New -> HaveLocalOffer", "t");
        sink.log(LogLevel::Warn, "unparseable candidate", "t");

        assert!(sink.contains(LogLevel::Debug, "HaveLocalOffer"));
        assert!(!sink.contains(LogLevel::Info, "HaveLocalOffer"));
        assert!(sink.contains(LogLevel::Warn, "unparseable"));
        assert_eq!(sink.lines().len(), 2);
    }
}
