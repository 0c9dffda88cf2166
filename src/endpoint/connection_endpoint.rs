use std::sync::{Arc, Mutex as StdMutex};

use rand::{Rng, RngCore, rngs::OsRng};
use tokio::{
    sync::{
        Mutex,
        mpsc::{self, UnboundedReceiver, UnboundedSender},
    },
    task::JoinHandle,
};

use crate::{
    data_channel::channel_registry::{ChannelRegistry, IncomingChannel},
    endpoint::{
        endpoint_error::EndpointError, endpoint_event::EndpointEvent, endpoint_id::EndpointId,
        remote_track::RemoteTrack, signaling_state::SignalingState,
    },
    ice::{
        Candidate, ConnectivityChecker, ConnectivityState, IceCandidate, LoopbackNetwork,
        candidate_pair::{CandidatePair, IceRole},
        ice_agent::{IceAgent, RemoteCandidateOutcome},
        loopback_network::{Datagram, SendHalf},
    },
    log::LogSink,
    media::MediaTrack,
    sdp::{
        SdpType, SessionDescription,
        description_builder::{
            DescriptionBuilder, SectionPlan, SetupRole, TrackBinding, sha256_fingerprint,
        },
        description_summary::DescriptionSummary,
        media::MediaKind,
    },
    sink_debug, sink_info, sink_trace, sink_warn,
};

const SESSION_VERSION: u64 = 2;
const OFFERER_FIRST_STREAM: u16 = 0;
const ANSWERER_FIRST_STREAM: u16 = 1;

struct AttachedTrack {
    track: Arc<MediaTrack>,
    stream_id: String,
}

struct EndpointInner {
    signaling: SignalingState,
    connectivity: ConnectivityState,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    remote_summary: Option<DescriptionSummary>,
    offer_created: bool,
    tracks: Vec<AttachedTrack>,
    ice: IceAgent,
    generated: Vec<IceCandidate>,
    recv_task: Option<JoinHandle<()>>,
}

/// One side of the simulated call.
///
/// All state sits behind a single async mutex: description application,
/// candidate application and teardown are serialized per endpoint.
pub struct ConnectionEndpoint {
    id: EndpointId,
    network: Arc<LoopbackNetwork>,
    component: u8,
    session_id: u64,
    fingerprint: String,
    logger: Arc<dyn LogSink>,
    events: UnboundedSender<EndpointEvent>,
    channels: Arc<StdMutex<ChannelRegistry>>,
    checker: ConnectivityChecker,
    inner: Mutex<EndpointInner>,
}

impl ConnectionEndpoint {
    /// Creates the endpoint and the receiver its events are delivered on.
    /// Events emitted before the receiver is polled are kept.
    pub fn new(
        id: EndpointId,
        network: Arc<LoopbackNetwork>,
        component: u8,
        logger: Arc<dyn LogSink>,
    ) -> (Self, UnboundedReceiver<EndpointEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let mut identity = [0u8; 32];
        OsRng.fill_bytes(&mut identity);
        // Browsers keep session ids below 2^62.
        let session_id = OsRng.gen_range(1..(1u64 << 62));
        let ice = IceAgent::new(IceRole::Controlling);
        let checker = ConnectivityChecker::new(ice.local_credentials().0, Arc::clone(&logger));

        let endpoint = Self {
            id,
            network,
            component,
            session_id,
            fingerprint: sha256_fingerprint(&identity),
            channels: Arc::new(StdMutex::new(ChannelRegistry::new(
                OFFERER_FIRST_STREAM,
                Arc::clone(&logger),
            ))),
            checker,
            logger,
            events,
            inner: Mutex::new(EndpointInner {
                signaling: SignalingState::New,
                connectivity: ConnectivityState::New,
                local_description: None,
                remote_description: None,
                remote_summary: None,
                offer_created: false,
                tracks: Vec::new(),
                ice,
                generated: Vec::new(),
                recv_task: None,
            }),
        };
        (endpoint, rx)
    }

    #[must_use]
    pub fn id(&self) -> EndpointId {
        self.id
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub async fn signaling_state(&self) -> SignalingState {
        self.inner.lock().await.signaling
    }

    pub async fn connectivity_state(&self) -> ConnectivityState {
        self.inner.lock().await.connectivity
    }

    pub async fn local_description(&self) -> Option<SessionDescription> {
        self.inner.lock().await.local_description.clone()
    }

    pub async fn remote_description(&self) -> Option<SessionDescription> {
        self.inner.lock().await.remote_description.clone()
    }

    /// Candidates this endpoint generated, in generation order.
    pub async fn local_candidates(&self) -> Vec<IceCandidate> {
        self.inner.lock().await.generated.clone()
    }

    /// Remote candidates applied so far, in application order.
    pub async fn remote_candidates(&self) -> Vec<Candidate> {
        self.inner.lock().await.ice.remote_candidates().to_vec()
    }

    /// Remote candidates waiting for a remote description.
    pub async fn pending_candidates(&self) -> usize {
        self.inner.lock().await.ice.pending_remote()
    }

    pub async fn nominated_pair(&self) -> Option<CandidatePair> {
        self.inner.lock().await.ice.nominated_pair().cloned()
    }

    pub async fn attached_tracks(&self) -> Vec<Arc<MediaTrack>> {
        self.inner
            .lock()
            .await
            .tracks
            .iter()
            .map(|t| Arc::clone(&t.track))
            .collect()
    }

    /// Schedules `track` for the next description this endpoint creates.
    ///
    /// # Errors
    /// [`EndpointError::InvalidState`] once the endpoint is `Stable` or terminal.
    pub async fn attach_track(
        &self,
        track: Arc<MediaTrack>,
        stream_id: &str,
    ) -> Result<(), EndpointError> {
        let mut inner = self.inner.lock().await;
        if matches!(inner.signaling, SignalingState::Stable) || inner.signaling.is_terminal() {
            return Err(EndpointError::InvalidState {
                op: "attach_track",
                state: inner.signaling,
            });
        }
        if inner.tracks.iter().any(|t| t.track.id() == track.id()) {
            return Ok(());
        }
        sink_debug!(
            self.logger,
            "[EP {}] attached {} track {}",
            self.id,
            track.kind(),
            track.id()
        );
        inner.tracks.push(AttachedTrack {
            track,
            stream_id: stream_id.to_owned(),
        });
        Ok(())
    }

    /// Opens a data channel initiated by this side. It stays `Connecting`
    /// until the pair is `Stable` and connected and the peer acknowledges.
    ///
    /// # Errors
    /// [`EndpointError::Closed`] on a closed or failed endpoint.
    pub async fn create_data_channel(&self, label: &str) -> Result<IncomingChannel, EndpointError> {
        let inner = self.inner.lock().await;
        if inner.signaling.is_terminal() {
            return Err(EndpointError::Closed);
        }
        let mut registry = self.channels.lock().map_err(|_| EndpointError::Closed)?;
        Ok(registry.create(label))
    }

    /// Builds an offer from the attached tracks and channels. Does not
    /// change state; apply it with [`apply_local_description`](Self::apply_local_description).
    ///
    /// # Errors
    /// [`EndpointError::InvalidState`] outside `New` or when an offer was already created.
    pub async fn create_offer(&self) -> Result<SessionDescription, EndpointError> {
        let mut inner = self.inner.lock().await;
        if inner.signaling != SignalingState::New || inner.offer_created {
            return Err(EndpointError::InvalidState {
                op: "create_offer",
                state: inner.signaling,
            });
        }

        let mut plans: Vec<SectionPlan> = inner
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| SectionPlan::Send {
                mid: i.to_string(),
                track: binding(t),
            })
            .collect();
        if self.has_channels() {
            plans.push(SectionPlan::Application {
                mid: plans.len().to_string(),
            });
        }

        let desc = self.render(&inner, SdpType::Offer, SetupRole::ActPass, &plans);
        inner.offer_created = true;
        sink_info!(
            self.logger,
            "[EP {}] created offer with {} section(s)",
            self.id,
            plans.len()
        );
        Ok(desc)
    }

    /// Builds an answer mirroring the applied remote offer's sections.
    ///
    /// # Errors
    /// [`EndpointError::InvalidState`] unless the endpoint is `HaveRemoteOffer`.
    pub async fn create_answer(&self) -> Result<SessionDescription, EndpointError> {
        let inner = self.inner.lock().await;
        let Some(summary) = inner
            .remote_summary
            .as_ref()
            .filter(|_| inner.signaling == SignalingState::HaveRemoteOffer)
        else {
            return Err(EndpointError::InvalidState {
                op: "create_answer",
                state: inner.signaling,
            });
        };

        let mut used = vec![false; inner.tracks.len()];
        let mut plans = Vec::with_capacity(summary.sections.len());
        for section in &summary.sections {
            let mid = section.mid.clone();
            match (&section.kind, section.kind.track_kind()) {
                (MediaKind::Application, _) => plans.push(SectionPlan::Application { mid }),
                (_, Some(kind)) => {
                    let local = inner
                        .tracks
                        .iter()
                        .enumerate()
                        .find(|(i, t)| !used[*i] && t.track.kind() == kind);
                    match local {
                        Some((i, t)) => {
                            used[i] = true;
                            plans.push(SectionPlan::Send {
                                mid,
                                track: binding(t),
                            });
                        }
                        None => plans.push(SectionPlan::Receive { mid, kind }),
                    }
                }
                (other, None) => {
                    sink_warn!(self.logger, "[EP {}] ignoring {} section", self.id, other);
                }
            }
        }

        let desc = self.render(&inner, SdpType::Answer, SetupRole::Active, &plans);
        sink_info!(self.logger, "[EP {}] created answer", self.id);
        Ok(desc)
    }

    /// Applies this side's own description and gathers its host candidate.
    ///
    /// # Errors
    /// [`EndpointError::InvalidState`] on an out-of-order call,
    /// [`EndpointError::Sdp`] on an unparseable payload. State is unchanged on error.
    pub async fn apply_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), EndpointError> {
        let mut inner = self.inner.lock().await;
        let next = match (desc.sdp_type(), inner.signaling) {
            (SdpType::Offer, SignalingState::New) if inner.local_description.is_none() => {
                SignalingState::HaveLocalOffer
            }
            (SdpType::Answer, SignalingState::HaveRemoteOffer) => SignalingState::Stable,
            (_, state) => {
                return Err(EndpointError::InvalidState {
                    op: "apply_local_description",
                    state,
                });
            }
        };
        desc.parse()?;

        let gathered = inner.ice.gather(&self.network, self.component)?;
        inner.local_description = Some(desc);
        self.set_signaling(&mut inner, next);

        if let Some(candidate) = gathered {
            self.start_receiver(&mut inner);
            let line = IceCandidate::from_candidate(&candidate, Some("0".to_owned()), 0);
            sink_debug!(self.logger, "[EP {}] gathered {}", self.id, candidate);
            inner.generated.push(line.clone());
            let _ = self.events.send(EndpointEvent::CandidateGenerated(line));
        }

        if next == SignalingState::Stable {
            self.run_checks(&mut inner).await;
        }
        Ok(())
    }

    /// Applies the peer's description, announces its tracks and flushes any
    /// buffered candidates in arrival order.
    ///
    /// # Errors
    /// [`EndpointError::InvalidState`] when a remote description is already
    /// applied or the call is out of order, [`EndpointError::Sdp`] on a
    /// malformed payload. State is unchanged on error.
    pub async fn apply_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), EndpointError> {
        let mut inner = self.inner.lock().await;
        let next = match (desc.sdp_type(), inner.signaling) {
            _ if inner.remote_description.is_some() => None,
            (SdpType::Offer, SignalingState::New) if !inner.offer_created => {
                Some(SignalingState::HaveRemoteOffer)
            }
            (SdpType::Answer, SignalingState::HaveLocalOffer) => Some(SignalingState::Stable),
            _ => None,
        };
        let Some(next) = next else {
            return Err(EndpointError::InvalidState {
                op: "apply_remote_description",
                state: inner.signaling,
            });
        };
        let sdp = desc.parse()?;
        let summary = DescriptionSummary::from_sdp(&sdp)?;

        if next == SignalingState::HaveRemoteOffer {
            inner.ice.set_role(IceRole::Controlled);
            if let Ok(mut registry) = self.channels.lock() {
                registry.set_first_stream_id(ANSWERER_FIRST_STREAM);
            }
        }

        for section in summary.sending_tracks() {
            let Some(kind) = section.kind.track_kind() else {
                continue;
            };
            let (stream_id, track_id) = match &section.msid {
                Some((s, t)) => (Some(s.clone()), Some(t.clone())),
                None => (None, None),
            };
            sink_debug!(
                self.logger,
                "[EP {}] remote {} track on mid {}",
                self.id,
                kind,
                section.mid
            );
            let _ = self.events.send(EndpointEvent::TrackReceived(RemoteTrack {
                kind,
                mid: section.mid.clone(),
                stream_id,
                track_id,
            }));
        }

        inner.remote_description = Some(desc);
        inner.remote_summary = Some(summary);
        self.set_signaling(&mut inner, next);

        let pending = inner.ice.take_pending();
        if !pending.is_empty() {
            sink_debug!(
                self.logger,
                "[EP {}] flushing {} buffered candidate(s)",
                self.id,
                pending.len()
            );
        }
        for candidate in &pending {
            self.apply_candidate(&mut inner, candidate);
        }

        if next == SignalingState::Stable {
            self.run_checks(&mut inner).await;
        }
        Ok(())
    }

    /// Hands the endpoint a remote candidate. Buffered until a remote
    /// description is applied; malformed or unreachable candidates are
    /// logged and otherwise ignored.
    pub async fn add_candidate(&self, candidate: IceCandidate) {
        let mut inner = self.inner.lock().await;
        if inner.signaling.is_terminal() {
            sink_debug!(
                self.logger,
                "[EP {}] dropping candidate, endpoint {}",
                self.id,
                inner.signaling
            );
            return;
        }
        if inner.remote_description.is_none() {
            sink_trace!(self.logger, "[EP {}] buffering {}", self.id, candidate.candidate);
            inner.ice.buffer_remote(candidate);
            return;
        }
        self.apply_candidate(&mut inner, &candidate);
        if inner.signaling == SignalingState::Stable {
            self.run_checks(&mut inner).await;
        }
    }

    /// Fail-stop teardown: both state machines go to `Failed`, channels close
    /// without a goodbye and the socket is released.
    pub async fn fail(&self, reason: &str) {
        let mut inner = self.inner.lock().await;
        if inner.signaling == SignalingState::Failed {
            return;
        }
        sink_warn!(self.logger, "[EP {}] failed: {}", self.id, reason);
        if let Ok(mut registry) = self.channels.lock() {
            registry.fail_all();
        }
        self.shutdown_transport(&mut inner);
        self.set_connectivity(&mut inner, ConnectivityState::Failed);
        self.set_signaling(&mut inner, SignalingState::Failed);
    }

    /// Orderly teardown: channels say goodbye, then the socket is released.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.signaling.is_terminal() {
            return;
        }
        if let Ok(mut registry) = self.channels.lock() {
            registry.close_all();
        }
        self.shutdown_transport(&mut inner);
        if inner.connectivity != ConnectivityState::New {
            self.set_connectivity(&mut inner, ConnectivityState::Disconnected);
        }
        self.set_signaling(&mut inner, SignalingState::Closed);
        sink_info!(self.logger, "[EP {}] closed", self.id);
    }

    fn has_channels(&self) -> bool {
        self.channels.lock().map(|r| !r.is_empty()).unwrap_or(false)
    }

    fn render(
        &self,
        inner: &EndpointInner,
        sdp_type: SdpType,
        setup: SetupRole,
        plans: &[SectionPlan],
    ) -> SessionDescription {
        let (ufrag, pwd) = inner.ice.local_credentials();
        let sdp = DescriptionBuilder {
            session_id: self.session_id,
            session_version: SESSION_VERSION,
            ice_ufrag: ufrag,
            ice_pwd: pwd,
            fingerprint: &self.fingerprint,
            setup,
        }
        .build(plans);
        SessionDescription::from_sdp(sdp_type, &sdp)
    }

    fn apply_candidate(&self, inner: &mut EndpointInner, candidate: &IceCandidate) {
        match inner.ice.apply_remote(candidate) {
            RemoteCandidateOutcome::Applied(c) => {
                sink_trace!(self.logger, "[EP {}] applied remote {}", self.id, c);
            }
            RemoteCandidateOutcome::Duplicate => {
                sink_debug!(self.logger, "[EP {}] duplicate candidate ignored", self.id);
            }
            RemoteCandidateOutcome::Unparseable(e) => {
                sink_warn!(
                    self.logger,
                    "[EP {}] ignoring candidate '{}': {}",
                    self.id,
                    candidate.candidate,
                    e
                );
            }
        }
    }

    /// Connectivity checks against the loopback fabric. Runs whenever the
    /// endpoint is `Stable` and has not yet nominated a pair.
    ///
    /// Pairs are checked best first; the first one whose binding request is
    /// answered by the peer is nominated. Unanswered remotes are not retried.
    /// The peer answers from its receive loop, which never takes this lock.
    async fn run_checks(&self, inner: &mut EndpointInner) {
        if inner.connectivity == ConnectivityState::Connected {
            return;
        }
        if inner.connectivity == ConnectivityState::New {
            self.set_connectivity(inner, ConnectivityState::Checking);
        }
        let Some(remote_ufrag) = inner.remote_summary.as_ref().map(|s| s.ice_ufrag.clone()) else {
            return;
        };
        let Some(sender) = inner.ice.socket_mut().map(|s| s.send_half()) else {
            return;
        };

        for pair in inner.ice.candidate_pairs() {
            let remote = pair.remote.address;
            if !self.checker.check(&sender, remote, &remote_ufrag).await {
                sink_debug!(self.logger, "[EP {}] no answer from {}", self.id, remote);
                inner.ice.mark_failed(remote);
                continue;
            }
            sink_info!(
                self.logger,
                "[EP {}] nominated {} -> {}",
                self.id,
                pair.local.address,
                remote
            );
            inner.ice.nominate(pair);
            self.set_connectivity(inner, ConnectivityState::Connected);
            if let Ok(mut registry) = self.channels.lock() {
                registry.connect(sender.link_to(remote));
            }
            return;
        }
        sink_trace!(self.logger, "[EP {}] no working pair yet", self.id);
    }

    fn start_receiver(&self, inner: &mut EndpointInner) {
        let Some(socket) = inner.ice.socket_mut() else {
            return;
        };
        let sender = socket.send_half();
        let Some(rx) = socket.take_receiver() else {
            return;
        };
        let task = tokio::spawn(receive_loop(
            rx,
            sender,
            self.checker.clone(),
            Arc::clone(&self.channels),
            self.events.clone(),
        ));
        inner.recv_task = Some(task);
    }

    fn shutdown_transport(&self, inner: &mut EndpointInner) {
        inner.ice.close();
        if let Some(task) = inner.recv_task.take() {
            task.abort();
        }
    }

    fn set_signaling(&self, inner: &mut EndpointInner, next: SignalingState) {
        if inner.signaling == next {
            return;
        }
        sink_debug!(
            self.logger,
            "[EP {}] signaling {} -> {}",
            self.id,
            inner.signaling,
            next
        );
        inner.signaling = next;
        let _ = self.events.send(EndpointEvent::SignalingStateChanged(next));
    }

    fn set_connectivity(&self, inner: &mut EndpointInner, next: ConnectivityState) {
        if inner.connectivity == next {
            return;
        }
        sink_debug!(
            self.logger,
            "[EP {}] connectivity {} -> {}",
            self.id,
            inner.connectivity,
            next
        );
        inner.connectivity = next;
        let _ = self.events.send(EndpointEvent::ConnectivityStateChanged(next));
    }
}

impl Drop for ConnectionEndpoint {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.channels.lock() {
            registry.fail_all();
        }
        if let Some(task) = self.inner.get_mut().recv_task.take() {
            task.abort();
        }
    }
}

fn binding(t: &AttachedTrack) -> TrackBinding {
    TrackBinding {
        kind: t.track.kind(),
        stream_id: t.stream_id.clone(),
        track_id: t.track.id().to_owned(),
    }
}

async fn receive_loop(
    mut rx: UnboundedReceiver<Datagram>,
    sender: SendHalf,
    checker: ConnectivityChecker,
    channels: Arc<StdMutex<ChannelRegistry>>,
    events: UnboundedSender<EndpointEvent>,
) {
    while let Some(dgram) = rx.recv().await {
        if checker.handle(&dgram, &sender) {
            continue;
        }
        let incoming = match channels.lock() {
            Ok(mut registry) => registry.dispatch(&dgram, &sender),
            Err(_) => break,
        };
        if let Some(channel) = incoming {
            let _ = events.send(EndpointEvent::DataChannel(channel));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use std::time::Duration;

    use super::*;
    use crate::{
        data_channel::{channel_event::ChannelEvent, channel_state::ChannelState},
        ice::binding_message::{BindingKind, BindingMessage},
        log::NoopLogSink,
        media::{MediaConstraints, MediaSource, SyntheticMediaSource},
    };

    const WAIT: Duration = Duration::from_secs(2);

    async fn next_channel(rx: &mut UnboundedReceiver<EndpointEvent>) -> IncomingChannel {
        tokio::time::timeout(WAIT, async {
            loop {
                if let EndpointEvent::DataChannel(ch) = rx.recv().await.unwrap() {
                    return ch;
                }
            }
        })
        .await
        .expect("no channel from the peer")
    }

    async fn opened(events: &mut UnboundedReceiver<ChannelEvent>) {
        tokio::time::timeout(WAIT, async {
            while events.recv().await.unwrap() != ChannelEvent::Opened {}
        })
        .await
        .expect("channel never opened");
    }

    fn pair() -> (
        ConnectionEndpoint,
        UnboundedReceiver<EndpointEvent>,
        ConnectionEndpoint,
        UnboundedReceiver<EndpointEvent>,
    ) {
        let net = LoopbackNetwork::new();
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let (a, ra) = ConnectionEndpoint::new(EndpointId::A, Arc::clone(&net), 1, Arc::clone(&logger));
        let (b, rb) = ConnectionEndpoint::new(EndpointId::B, net, 1, logger);
        (a, ra, b, rb)
    }

    #[tokio::test]
    async fn create_offer_leaves_state_and_refuses_a_second_call() {
        let (a, _ra, _b, _rb) = pair();
        let offer = a.create_offer().await.unwrap();
        assert_eq!(offer.sdp_type(), SdpType::Offer);
        assert_eq!(a.signaling_state().await, SignalingState::New);
        assert!(matches!(
            a.create_offer().await,
            Err(EndpointError::InvalidState {
                op: "create_offer",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn offer_is_deterministic_for_the_track_set() {
        let source = SyntheticMediaSource::new();
        let stream = source.acquire(MediaConstraints::audio_video()).await.unwrap();
        let net = LoopbackNetwork::new();
        let (a, _ra) = ConnectionEndpoint::new(EndpointId::A, net, 1, Arc::new(NoopLogSink));
        for t in stream.tracks() {
            a.attach_track(Arc::clone(t), stream.id()).await.unwrap();
        }
        let first = a.create_offer().await.unwrap();
        let sdp = first.parse().unwrap();
        let kinds: Vec<_> = sdp.media.iter().map(|m| m.kind.clone()).collect();
        assert_eq!(kinds, vec![MediaKind::Audio, MediaKind::Video]);
        assert!(first.payload().contains(a.fingerprint()));

        let inner = a.inner.lock().await;
        let plans: Vec<_> = inner
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| SectionPlan::Send {
                mid: i.to_string(),
                track: binding(t),
            })
            .collect();
        let again = a.render(&inner, SdpType::Offer, SetupRole::ActPass, &plans);
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn answer_requires_remote_offer() {
        let (a, _ra, _b, _rb) = pair();
        assert!(matches!(
            a.create_answer().await,
            Err(EndpointError::InvalidState {
                state: SignalingState::New,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn remote_answer_before_local_offer_is_rejected() {
        let (a, _ra, b, _rb) = pair();
        let offer = a.create_offer().await.unwrap();
        a.apply_local_description(offer.clone()).await.unwrap();
        b.apply_remote_description(offer).await.unwrap();
        let answer = b.create_answer().await.unwrap();

        let (c, _rc) = ConnectionEndpoint::new(
            EndpointId::A,
            LoopbackNetwork::new(),
            1,
            Arc::new(NoopLogSink),
        );
        assert!(matches!(
            c.apply_remote_description(answer).await,
            Err(EndpointError::InvalidState { .. })
        ));
        assert_eq!(c.signaling_state().await, SignalingState::New);
    }

    #[tokio::test]
    async fn malformed_remote_payload_leaves_state_unchanged() {
        let (_a, _ra, b, _rb) = pair();
        let bogus = SessionDescription::new(SdpType::Offer, "not sdp at all");
        assert!(matches!(
            b.apply_remote_description(bogus).await,
            Err(EndpointError::Sdp(_))
        ));
        assert_eq!(b.signaling_state().await, SignalingState::New);
        assert!(b.remote_description().await.is_none());
    }

    #[tokio::test]
    async fn local_offer_emits_candidate_and_signaling_change() {
        let (a, mut ra, _b, _rb) = pair();
        let offer = a.create_offer().await.unwrap();
        a.apply_local_description(offer).await.unwrap();

        assert!(matches!(
            ra.recv().await.unwrap(),
            EndpointEvent::SignalingStateChanged(SignalingState::HaveLocalOffer)
        ));
        let EndpointEvent::CandidateGenerated(c) = ra.recv().await.unwrap() else {
            panic!("expected a candidate");
        };
        assert_eq!(c.sdp_mid.as_deref(), Some("0"));
        assert!(c.parse().is_ok());
        assert_eq!(a.local_candidates().await, vec![c]);
    }

    #[tokio::test]
    async fn attach_after_stable_is_rejected() {
        let (a, _ra, b, _rb) = pair();
        let offer = a.create_offer().await.unwrap();
        a.apply_local_description(offer.clone()).await.unwrap();
        b.apply_remote_description(offer).await.unwrap();
        let answer = b.create_answer().await.unwrap();
        b.apply_local_description(answer).await.unwrap();
        assert_eq!(b.signaling_state().await, SignalingState::Stable);

        let source = SyntheticMediaSource::new();
        let stream = source.acquire(MediaConstraints::audio_video()).await.unwrap();
        let track = Arc::clone(&stream.tracks()[0]);
        assert!(matches!(
            b.attach_track(track, stream.id()).await,
            Err(EndpointError::InvalidState {
                op: "attach_track",
                state: SignalingState::Stable
            })
        ));
    }

    #[tokio::test]
    async fn fail_is_terminal_and_drops_candidates() {
        let (a, _ra, _b, _rb) = pair();
        a.fail("test").await;
        assert_eq!(a.signaling_state().await, SignalingState::Failed);
        assert_eq!(a.connectivity_state().await, ConnectivityState::Failed);

        a.add_candidate(IceCandidate::new(
            "candidate:1 1 udp 1 127.0.0.1 9 typ host",
            None,
            0,
        ))
        .await;
        assert_eq!(a.pending_candidates().await, 0);
        assert!(matches!(
            a.create_data_channel("x").await,
            Err(EndpointError::Closed)
        ));
    }

    #[tokio::test]
    async fn bound_stranger_loses_to_the_peer_that_answers() {
        let net = LoopbackNetwork::new();
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let (a, _ra) = ConnectionEndpoint::new(EndpointId::A, Arc::clone(&net), 1, Arc::clone(&logger));
        let (b, mut rb) = ConnectionEndpoint::new(EndpointId::B, Arc::clone(&net), 1, logger);
        let mut stranger = net.bind().unwrap();
        let mut stranger_rx = stranger.take_receiver().unwrap();

        let (dc_a, mut ev_a) = a.create_data_channel("chat").await.unwrap();
        let offer = a.create_offer().await.unwrap();
        a.apply_local_description(offer.clone()).await.unwrap();
        b.apply_remote_description(offer).await.unwrap();
        let answer = b.create_answer().await.unwrap();
        b.apply_local_description(answer.clone()).await.unwrap();

        // Both arrive before the answer; the stranger outranks the peer.
        let b_cand = b.local_candidates().await.remove(0);
        a.add_candidate(b_cand.clone()).await;
        let port = stranger.local_addr().port();
        a.add_candidate(IceCandidate::new(
            &format!("candidate:9 1 udp 4294967295 127.0.0.1 {port} typ host"),
            Some("0".into()),
            0,
        ))
        .await;
        a.apply_remote_description(answer).await.unwrap();

        opened(&mut ev_a).await;
        assert_eq!(dc_a.state(), ChannelState::Open);
        let (dc_b, _) = next_channel(&mut rb).await;
        assert_eq!(dc_b.label(), "chat");

        let pair = a.nominated_pair().await.unwrap();
        assert_eq!(pair.remote.address, b_cand.parse().unwrap().address);
        assert_eq!(a.connectivity_state().await, ConnectivityState::Connected);

        // The stranger was asked first and stayed silent.
        let asked = stranger_rx.try_recv().unwrap();
        let msg = BindingMessage::decode(&asked.payload).unwrap();
        assert_eq!(msg.kind, BindingKind::Request);
        assert!(stranger_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn channel_created_before_the_offer_arrives_takes_odd_stream() {
        let (a, mut ra, b, mut rb) = pair();
        let (dc_b, mut ev_b) = b.create_data_channel("telemetry").await.unwrap();
        let (dc_a, mut ev_a) = a.create_data_channel("chat").await.unwrap();
        assert_eq!((dc_a.stream_id(), dc_b.stream_id()), (0, 0));

        let offer = a.create_offer().await.unwrap();
        a.apply_local_description(offer.clone()).await.unwrap();
        b.apply_remote_description(offer).await.unwrap();
        assert_eq!(dc_b.stream_id(), 1);

        let answer = b.create_answer().await.unwrap();
        b.apply_local_description(answer.clone()).await.unwrap();
        for c in a.local_candidates().await {
            b.add_candidate(c).await;
        }
        a.apply_remote_description(answer).await.unwrap();
        for c in b.local_candidates().await {
            a.add_candidate(c).await;
        }

        opened(&mut ev_a).await;
        opened(&mut ev_b).await;
        let (mirror_of_b, _) = next_channel(&mut ra).await;
        let (mirror_of_a, _) = next_channel(&mut rb).await;
        assert_eq!((mirror_of_b.label(), mirror_of_b.stream_id()), ("telemetry", 1));
        assert_eq!((mirror_of_a.label(), mirror_of_a.stream_id()), ("chat", 0));
    }
}
