use std::sync::mpsc;

use crate::{
    log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink},
    utils::now_millis,
};

/// Cloneable producer side of the [`Logger`](crate::log::logger::Logger).
///
/// Enqueues into a bounded `SyncSender`; a full queue drops the line instead of
/// stalling the caller, which matters inside negotiation steps.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Attempts to enqueue a log line without blocking.
    ///
    /// # Errors
    /// - `TrySendError::Full` when the queue is at capacity (line dropped).
    /// - `TrySendError::Disconnected` when the writer thread is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        self.tx
            .try_send(LogMsg::new(level, text, target, now_millis()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc::{TrySendError, sync_channel};

    #[test]
    fn try_log_ok_when_capacity_available() {
        let (tx, rx) = sync_channel::<LogMsg>(2);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "call started", "loopcall::call")
            .expect("queue has room");

        let msg = rx.recv().expect("a message should arrive");
        assert_eq!(msg.level, LogLevel::Info);
        assert_eq!(msg.text, "call started");
        assert_eq!(msg.target, "loopcall::call");
        assert!(msg.ts_ms > 0);
    }

    #[test]
    fn try_log_err_full_when_queue_full() {
        let (tx, _rx) = sync_channel::<LogMsg>(1);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Debug, "first", "t").expect("first fits");
        match h.try_log(LogLevel::Debug, "second", "t") {
            Err(TrySendError::Full(m)) => assert_eq!(m.text, "second"),
            other => panic!("expected Full, got: {other:?}"),
        }
    }

    #[test]
    fn sink_impl_swallows_disconnected() {
        let (tx, rx) = sync_channel::<LogMsg>(1);
        drop(rx);
        let h = LoggerHandle { tx };
        // Must not panic even though nobody is listening.
        h.log(LogLevel::Error, "lost", "t");
    }
}
