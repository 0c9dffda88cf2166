use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    data_channel::{
        ChannelEvent, DataChannel, channel_registry::IncomingChannel,
    },
    endpoint::{ConnectionEndpoint, EndpointId},
    log::LogSink,
    media::MediaStream,
    orchestrator::call_state::CallState,
    relay::CandidateRelay,
    sink_info,
};

/// One side's end of the chat channel.
#[derive(Debug)]
pub struct ChannelSide {
    pub channel: DataChannel,
    pub events: Option<UnboundedReceiver<ChannelEvent>>,
}

/// A connected call. Owns the stream, both endpoints, the relay and both
/// ends of the data channel; [`hang_up`](Self::hang_up) or dropping it
/// tears all of them down.
pub struct Call {
    pub(crate) stream: Arc<MediaStream>,
    pub(crate) a: Arc<ConnectionEndpoint>,
    pub(crate) b: Arc<ConnectionEndpoint>,
    pub(crate) relay: Arc<dyn CandidateRelay>,
    pub(crate) local: ChannelSide,
    pub(crate) remote: ChannelSide,
    pub(crate) incoming_a: UnboundedReceiver<IncomingChannel>,
    pub(crate) incoming_b: UnboundedReceiver<IncomingChannel>,
    pub(crate) state: Arc<Mutex<CallState>>,
    pub(crate) logger: Arc<dyn LogSink>,
    pub(crate) ended: bool,
}

impl Call {
    #[must_use]
    pub fn stream(&self) -> &Arc<MediaStream> {
        &self.stream
    }

    #[must_use]
    pub fn endpoint(&self, id: EndpointId) -> &Arc<ConnectionEndpoint> {
        match id {
            EndpointId::A => &self.a,
            EndpointId::B => &self.b,
        }
    }

    /// The chat channel as seen from `id`: A created it, B holds the mirror.
    #[must_use]
    pub fn channel(&self, id: EndpointId) -> &DataChannel {
        match id {
            EndpointId::A => &self.local.channel,
            EndpointId::B => &self.remote.channel,
        }
    }

    /// Takes the event receiver of `id`'s channel end. Only the first call
    /// returns it.
    pub fn take_channel_events(
        &mut self,
        id: EndpointId,
    ) -> Option<UnboundedReceiver<ChannelEvent>> {
        match id {
            EndpointId::A => self.local.events.take(),
            EndpointId::B => self.remote.events.take(),
        }
    }

    /// Waits for the next channel the peer opens towards `id`.
    pub async fn accept_channel(&mut self, id: EndpointId) -> Option<IncomingChannel> {
        match id {
            EndpointId::A => self.incoming_a.recv().await,
            EndpointId::B => self.incoming_b.recv().await,
        }
    }

    #[must_use]
    pub fn state(&self) -> CallState {
        self.state.lock().map(|s| *s).unwrap_or(CallState::Ended)
    }

    /// Closes the channel, both endpoints and the relay, then releases the
    /// stream. Idempotent.
    pub async fn hang_up(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.local.channel.close();
        self.remote.channel.close();
        self.a.close().await;
        self.b.close().await;
        self.finish();
        sink_info!(self.logger, "[CALL] hung up");
    }

    fn finish(&self) {
        self.relay.close();
        self.stream.release();
        if let Ok(mut s) = self.state.lock() {
            *s = CallState::Ended;
        }
    }
}

impl Drop for Call {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.local.channel.close();
        self.remote.channel.close();
        self.finish();
    }
}
