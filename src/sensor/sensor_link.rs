use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    data_channel::{ChannelEvent, DataChannel},
    log::LogSink,
    sensor::{sensor_error::SensorError, sensor_message::SensorMessage},
    sink_debug, sink_warn,
};

/// Carries [`SensorMessage`] records over an open data channel as JSON text.
pub struct SensorLink {
    channel: DataChannel,
    events: UnboundedReceiver<ChannelEvent>,
    logger: Arc<dyn LogSink>,
}

impl SensorLink {
    pub fn new(
        channel: DataChannel,
        events: UnboundedReceiver<ChannelEvent>,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            channel,
            events,
            logger,
        }
    }

    /// # Errors
    /// [`SensorError::Channel`] if the channel is not open.
    pub fn send(&self, msg: &SensorMessage) -> Result<(), SensorError> {
        let text = serde_json::to_string(msg).map_err(SensorError::Encode)?;
        self.channel.send(&text)?;
        Ok(())
    }

    /// Next decoded record. Non-text events are skipped; `None` once the
    /// channel is closed.
    pub async fn recv(&mut self) -> Option<Result<SensorMessage, SensorError>> {
        loop {
            match self.events.recv().await? {
                ChannelEvent::Message(text) => {
                    return Some(serde_json::from_str(&text).map_err(|e| {
                        sink_warn!(self.logger, "[SENSOR] undecodable record: {}", e);
                        SensorError::Decode(e)
                    }));
                }
                ChannelEvent::Closed => return None,
                other => sink_debug!(self.logger, "[SENSOR] skipping {:?}", other),
            }
        }
    }
}
