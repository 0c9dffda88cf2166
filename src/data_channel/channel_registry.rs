use std::{collections::HashMap, sync::Arc};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    data_channel::{
        channel_event::ChannelEvent,
        channel_state::ChannelState,
        data_channel::DataChannel,
        dcep::ControlMessage,
        frame::{ChannelFrame, Ppid},
    },
    ice::loopback_network::{Datagram, Link, SendHalf},
    log::LogSink,
    sink_debug, sink_info, sink_warn,
};

/// A channel the peer opened, handed to the endpoint's subscriber.
pub type IncomingChannel = (DataChannel, UnboundedReceiver<ChannelEvent>);

/// Every data channel of one endpoint, keyed by stream id.
pub struct ChannelRegistry {
    channels: HashMap<u16, DataChannel>,
    next_stream_id: u16,
    link: Option<Link>,
    /// Set by `close_all`/`fail_all`; later datagrams are dropped.
    shut: bool,
    logger: Arc<dyn LogSink>,
}

impl ChannelRegistry {
    /// `first_stream_id` is 0 on the offering side and 1 on the answering
    /// side so locally allocated ids never collide.
    pub fn new(first_stream_id: u16, logger: Arc<dyn LogSink>) -> Self {
        Self {
            channels: HashMap::new(),
            next_stream_id: first_stream_id,
            link: None,
            shut: false,
            logger,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Switches local allocation to start at `id`. Channels created before
    /// the role was known are renumbered in creation order; nothing has been
    /// sent on them yet.
    pub fn set_first_stream_id(&mut self, id: u16) {
        if self.link.is_some() {
            return;
        }
        let mut local: Vec<DataChannel> = self
            .channels
            .values()
            .filter(|dc| dc.is_initiator())
            .cloned()
            .collect();
        local.sort_by_key(DataChannel::stream_id);
        self.next_stream_id = id;
        for dc in local {
            let old = dc.stream_id();
            let new = self.next_stream_id;
            self.next_stream_id = self.next_stream_id.wrapping_add(2);
            if old == new {
                continue;
            }
            self.channels.remove(&old);
            dc.reassign_stream_id(new);
            sink_debug!(
                self.logger,
                "[DC] '{}' moved from stream {} to {}",
                dc.label(),
                old,
                new
            );
            self.channels.insert(new, dc);
        }
    }

    /// Allocates a local channel. If the transport is already up the OPEN
    /// goes out right away.
    pub fn create(&mut self, label: &str) -> IncomingChannel {
        let stream_id = self.next_stream_id;
        self.next_stream_id = self.next_stream_id.wrapping_add(2);
        let (dc, rx) = DataChannel::new(label, stream_id, true, Arc::clone(&self.logger));
        self.channels.insert(stream_id, dc.clone());
        sink_debug!(self.logger, "[DC] created '{}' on stream {}", label, stream_id);
        if let Some(link) = &self.link {
            dc.attach_transport(link.clone());
        }
        (dc, rx)
    }

    /// Called once the nominated pair is known.
    pub fn connect(&mut self, link: Link) {
        sink_info!(
            self.logger,
            "[DC] transport ready {} -> {}",
            link.local(),
            link.remote()
        );
        for dc in self.channels.values() {
            if dc.is_initiator() && dc.state() == ChannelState::Connecting {
                dc.attach_transport(link.clone());
            }
        }
        self.link = Some(link);
    }

    /// Routes one inbound datagram. A peer OPEN on an unknown stream yields
    /// the mirrored channel, already open.
    pub fn dispatch(&mut self, dgram: &Datagram, sender: &SendHalf) -> Option<IncomingChannel> {
        if self.shut {
            return None;
        }
        let frame = match ChannelFrame::decode(&dgram.payload) {
            Ok(f) => f,
            Err(e) => {
                sink_warn!(self.logger, "[DC] dropping datagram from {}: {}", dgram.from, e);
                return None;
            }
        };

        if let Some(dc) = self.channels.get(&frame.stream_id) {
            dc.handle_frame(frame);
            return None;
        }

        if frame.ppid != Ppid::Control {
            sink_warn!(self.logger, "[DC] data for unknown stream {}", frame.stream_id);
            return None;
        }
        match ControlMessage::deserialize(&frame.payload) {
            Ok(ControlMessage::Open { label }) => {
                let (dc, rx) =
                    DataChannel::new(&label, frame.stream_id, false, Arc::clone(&self.logger));
                dc.observe_ssn(frame.ssn);
                dc.attach_transport(sender.link_to(dgram.from));
                dc.accept();
                self.channels.insert(frame.stream_id, dc.clone());
                sink_info!(
                    self.logger,
                    "[DC] peer opened '{}' on stream {}",
                    label,
                    frame.stream_id
                );
                Some((dc, rx))
            }
            Ok(other) => {
                sink_debug!(
                    self.logger,
                    "[DC] {:?} for unknown stream {}",
                    other,
                    frame.stream_id
                );
                None
            }
            Err(e) => {
                sink_warn!(self.logger, "[DC] bad control message: {}", e);
                None
            }
        }
    }

    /// Closes every channel, telling the peer where possible.
    pub fn close_all(&mut self) {
        for dc in self.channels.values() {
            dc.close();
        }
        self.link = None;
        self.shut = true;
    }

    /// Closes every channel without notifying the peer.
    pub fn fail_all(&mut self) {
        for dc in self.channels.values() {
            dc.mark_closed();
        }
        self.link = None;
        self.shut = true;
    }
}
