use std::fmt;

/// Severity of a log line, ordered from noisiest to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-candidate and per-frame traffic.
    Trace,
    /// State transitions useful when following a negotiation.
    Debug,
    /// Call milestones (media acquired, channel open, hang up).
    Info,
    /// Recoverable oddities (ignored candidate, send on a closed channel).
    Warn,
    /// Failures that abort a call attempt.
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
