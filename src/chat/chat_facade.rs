use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    chat::{
        chat_error::ChatError,
        chat_message::{ChatLine, ChatMessage, ChatOrigin},
    },
    data_channel::{ChannelEvent, ChannelState, DataChannel},
    log::LogSink,
    sink_debug,
    utils::now_millis,
};

const OPENED_LINE: &str = "Connection established!";
const CLOSED_LINE: &str = "Connection lost.";

/// Turns data channel events into chat lines and user input into sends.
/// Holds nothing but the display log and the input affordance.
pub struct ChatFacade {
    channel: DataChannel,
    lines: Vec<ChatLine>,
    input_enabled: bool,
    logger: Arc<dyn LogSink>,
}

impl ChatFacade {
    pub fn new(channel: DataChannel, logger: Arc<dyn LogSink>) -> Self {
        Self {
            channel,
            lines: Vec::new(),
            input_enabled: false,
            logger,
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[ChatLine] {
        &self.lines
    }

    /// Whether the send affordance should be enabled.
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    #[must_use]
    pub fn channel(&self) -> &DataChannel {
        &self.channel
    }

    /// Sends `text` and logs it as a `Me` line. Input that is blank after
    /// trimming is ignored and returns `Ok(false)`.
    ///
    /// # Errors
    /// [`ChatError::Channel`] when the channel is not open; no line is added.
    pub fn submit(&mut self, text: &str) -> Result<bool, ChatError> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        self.channel.send(text)?;
        self.lines.push(ChatLine::Message(ChatMessage {
            text: text.to_owned(),
            origin: ChatOrigin::Local,
            timestamp_ms: now_millis(),
        }));
        Ok(true)
    }

    /// Applies one channel event. Returns the line it produced, if any.
    pub fn handle_event(&mut self, event: ChannelEvent) -> Option<&ChatLine> {
        let line = match event {
            ChannelEvent::Opened => {
                self.input_enabled = true;
                ChatLine::System(OPENED_LINE.to_owned())
            }
            ChannelEvent::Closed => {
                self.input_enabled = false;
                ChatLine::System(CLOSED_LINE.to_owned())
            }
            ChannelEvent::Message(text) => ChatLine::Message(ChatMessage {
                text,
                origin: ChatOrigin::Remote,
                timestamp_ms: now_millis(),
            }),
            ChannelEvent::Binary(data) => {
                sink_debug!(
                    self.logger,
                    "[CHAT] ignoring {} binary bytes on '{}'",
                    data.len(),
                    self.channel.label()
                );
                return None;
            }
        };
        self.lines.push(line);
        self.lines.last()
    }

    /// Applies every event already queued on `events`.
    pub fn drain(&mut self, events: &mut UnboundedReceiver<ChannelEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        if self.channel.state() == ChannelState::Closed {
            self.input_enabled = false;
        }
        applied
    }

    /// The log as text, one line per entry.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
