use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU16, Ordering},
};

use bytes::Bytes;
use tokio::sync::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    watch,
};

use crate::{
    data_channel::{
        channel_error::ChannelError,
        channel_event::ChannelEvent,
        channel_state::ChannelState,
        dcep::ControlMessage,
        frame::{ChannelFrame, Ppid},
    },
    frame_trace,
    ice::loopback_network::Link,
    log::LogSink,
    sink_debug, sink_info, sink_warn,
};

struct ChannelShared {
    label: String,
    /// Renumbered at most once, before the transport is attached.
    stream_id: AtomicU16,
    /// Created locally, so this side sends OPEN.
    initiator: bool,
    state: watch::Sender<ChannelState>,
    link: Mutex<Option<Link>>,
    next_ssn: AtomicU16,
    expected_ssn: AtomicU16,
    events: UnboundedSender<ChannelEvent>,
    logger: Arc<dyn LogSink>,
}

/// A reliable, ordered message channel between the two endpoints.
///
/// Handles are cheap to clone and all refer to the same channel.
#[derive(Clone)]
pub struct DataChannel {
    shared: Arc<ChannelShared>,
}

impl std::fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannel")
            .field("label", &self.shared.label)
            .field("stream_id", &self.stream_id())
            .field("state", &self.state())
            .finish()
    }
}

impl DataChannel {
    pub(crate) fn new(
        label: &str,
        stream_id: u16,
        initiator: bool,
        logger: Arc<dyn LogSink>,
    ) -> (Self, UnboundedReceiver<ChannelEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ChannelState::Connecting);
        let shared = Arc::new(ChannelShared {
            label: label.to_owned(),
            stream_id: AtomicU16::new(stream_id),
            initiator,
            state,
            link: Mutex::new(None),
            next_ssn: AtomicU16::new(0),
            expected_ssn: AtomicU16::new(0),
            events,
            logger,
        });
        (Self { shared }, rx)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    #[must_use]
    pub fn stream_id(&self) -> u16 {
        self.shared.stream_id.load(Ordering::Acquire)
    }

    pub(crate) fn reassign_stream_id(&self, stream_id: u16) {
        self.shared.stream_id.store(stream_id, Ordering::Release);
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    /// Delivery on this channel is always ordered and reliable.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        true
    }

    /// Queues `text` for the peer. Never blocks.
    ///
    /// # Errors
    /// [`ChannelError::ChannelNotOpen`] unless the channel is `Open`; nothing
    /// is delivered in that case.
    pub fn send(&self, text: &str) -> Result<(), ChannelError> {
        self.send_payload(Ppid::String, Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Binary counterpart of [`send`](Self::send).
    ///
    /// # Errors
    /// Same as [`send`](Self::send).
    pub fn send_binary(&self, data: Bytes) -> Result<(), ChannelError> {
        self.send_payload(Ppid::Binary, data)
    }

    /// Closes both ends. No-op when already closed.
    pub fn close(&self) {
        if self.state() == ChannelState::Closed {
            return;
        }
        if let Err(e) = self.send_control(&ControlMessage::Close) {
            sink_debug!(
                self.shared.logger,
                "[DC] '{}' CLOSE not delivered: {}",
                self.label(),
                e
            );
        }
        self.mark_closed();
    }

    /// Resolves once the channel is `Open`.
    ///
    /// # Errors
    /// [`ChannelError::ChannelNotOpen`] if it closes first.
    pub async fn wait_open(&self) -> Result<(), ChannelError> {
        let mut rx = self.shared.state.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                ChannelState::Open => return Ok(()),
                ChannelState::Closed => return Err(ChannelError::ChannelNotOpen { state }),
                ChannelState::Connecting => {}
            }
            if rx.changed().await.is_err() {
                return Err(ChannelError::ChannelNotOpen {
                    state: ChannelState::Closed,
                });
            }
        }
    }

    fn send_payload(&self, ppid: Ppid, payload: Bytes) -> Result<(), ChannelError> {
        let state = self.state();
        if state != ChannelState::Open {
            return Err(ChannelError::ChannelNotOpen { state });
        }
        if self.transmit(ppid, payload)? {
            Ok(())
        } else {
            sink_warn!(
                self.shared.logger,
                "[DC] '{}' peer unreachable, closing",
                self.label()
            );
            self.mark_closed();
            Err(ChannelError::ChannelNotOpen {
                state: ChannelState::Closed,
            })
        }
    }

    fn send_control(&self, msg: &ControlMessage) -> Result<bool, ChannelError> {
        self.transmit(Ppid::Control, msg.serialize()?)
    }

    /// Stamps the next SSN and sends. The link lock is held across both so
    /// concurrent senders cannot reorder frames.
    fn transmit(&self, ppid: Ppid, payload: Bytes) -> Result<bool, ChannelError> {
        let Ok(guard) = self.shared.link.lock() else {
            return Ok(false);
        };
        let Some(link) = guard.as_ref() else {
            return Ok(false);
        };
        let frame = ChannelFrame {
            stream_id: self.stream_id(),
            ssn: self.shared.next_ssn.fetch_add(1, Ordering::SeqCst),
            ppid,
            payload,
        };
        frame_trace!(
            self.shared.logger,
            "[DC] tx stream={} ssn={} ppid={:?} len={}",
            frame.stream_id,
            frame.ssn,
            frame.ppid,
            frame.payload.len()
        );
        Ok(link.send(frame.encode()?))
    }

    /// Gives the channel its path to the peer. An initiating channel that is
    /// still connecting announces itself with OPEN.
    pub(crate) fn attach_transport(&self, link: Link) {
        if let Ok(mut guard) = self.shared.link.lock() {
            *guard = Some(link);
        }
        if self.shared.initiator && self.state() == ChannelState::Connecting {
            let label = self.shared.label.clone();
            match self.send_control(&ControlMessage::Open { label }) {
                Ok(true) => sink_debug!(self.shared.logger, "[DC] '{}' OPEN sent", self.label()),
                Ok(false) => {
                    sink_warn!(self.shared.logger, "[DC] '{}' OPEN undeliverable", self.label());
                }
                Err(e) => sink_warn!(self.shared.logger, "[DC] '{}' OPEN failed: {}", self.label(), e),
            }
        }
    }

    pub(crate) fn mark_open(&self) {
        let changed = self.shared.state.send_if_modified(|s| {
            if *s == ChannelState::Connecting {
                *s = ChannelState::Open;
                true
            } else {
                false
            }
        });
        if changed {
            sink_info!(self.shared.logger, "[DC] '{}' open", self.label());
            let _ = self.shared.events.send(ChannelEvent::Opened);
        }
    }

    pub(crate) fn mark_closed(&self) {
        let changed = self.shared.state.send_if_modified(|s| {
            if *s == ChannelState::Closed {
                false
            } else {
                *s = ChannelState::Closed;
                true
            }
        });
        if let Ok(mut guard) = self.shared.link.lock() {
            *guard = None;
        }
        if changed {
            sink_info!(self.shared.logger, "[DC] '{}' closed", self.label());
            let _ = self.shared.events.send(ChannelEvent::Closed);
        }
    }

    /// Records `ssn` as received; a gap is logged, not fatal.
    pub(crate) fn observe_ssn(&self, ssn: u16) {
        let expected = self.shared.expected_ssn.swap(ssn.wrapping_add(1), Ordering::SeqCst);
        if ssn != expected {
            sink_warn!(
                self.shared.logger,
                "[DC] '{}' ssn gap: expected {} got {}",
                self.label(),
                expected,
                ssn
            );
        }
    }

    /// Handles an inbound frame addressed to this channel's stream.
    pub(crate) fn handle_frame(&self, frame: ChannelFrame) {
        self.observe_ssn(frame.ssn);
        match frame.ppid {
            Ppid::Control => match ControlMessage::deserialize(&frame.payload) {
                Ok(ControlMessage::Ack) => self.mark_open(),
                Ok(ControlMessage::Close) => self.mark_closed(),
                Ok(ControlMessage::Open { label }) => {
                    sink_warn!(
                        self.shared.logger,
                        "[DC] duplicate OPEN('{}') on stream {}",
                        label,
                        self.stream_id()
                    );
                }
                Err(e) => sink_warn!(self.shared.logger, "[DC] bad control message: {}", e),
            },
            Ppid::String | Ppid::Binary if self.state() != ChannelState::Open => {
                sink_debug!(
                    self.shared.logger,
                    "[DC] '{}' dropped data while {}",
                    self.label(),
                    self.state()
                );
            }
            Ppid::String => match String::from_utf8(frame.payload.to_vec()) {
                Ok(text) => {
                    let _ = self.shared.events.send(ChannelEvent::Message(text));
                }
                Err(e) => sink_warn!(self.shared.logger, "[DC] non UTF-8 string frame: {}", e),
            },
            Ppid::Binary => {
                let _ = self.shared.events.send(ChannelEvent::Binary(frame.payload));
            }
        }
    }

    /// Sends ACK for a peer-initiated channel and opens it.
    pub(crate) fn accept(&self) {
        match self.send_control(&ControlMessage::Ack) {
            Ok(true) => {}
            Ok(false) => sink_warn!(self.shared.logger, "[DC] '{}' ACK undeliverable", self.label()),
            Err(e) => sink_warn!(self.shared.logger, "[DC] '{}' ACK failed: {}", self.label(), e),
        }
        self.mark_open();
    }

    pub(crate) fn is_initiator(&self) -> bool {
        self.shared.initiator
    }
}
