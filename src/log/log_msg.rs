use crate::log::log_level::LogLevel;

/// A single log line travelling from a producer to the logger worker.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Milliseconds since the UNIX epoch.
    pub ts_ms: u128,
    pub text: String,
    /// Module path of the producer.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(
        level: LogLevel,
        text: impl Into<String>,
        target: &'static str,
        ts_ms: u128,
    ) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Renders the line the way it lands in the log file.
    #[must_use]
    pub fn render(&self) -> String {
        format!("[{}] {} {} | {}", self.level, self.ts_ms, self.target, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_level_target_and_text() {
        let msg = LogMsg::new(LogLevel::Warn, "candidate ignored", "loopcall::endpoint", 42);
        assert_eq!(
            msg.render(),
            "[WARN] 42 loopcall::endpoint | candidate ignored"
        );
    }
}
