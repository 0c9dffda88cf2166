use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::Instant,
};

use crate::{
    data_channel::channel_registry::IncomingChannel,
    endpoint::{ConnectionEndpoint, EndpointEvent, EndpointId},
    ice::LoopbackNetwork,
    log::LogSink,
    media::{MediaSource, MediaStream},
    orchestrator::{
        abort_handle::AbortHandle,
        call::{Call, ChannelSide},
        call_config::CallConfig,
        call_error::CallError,
        call_event::CallEvent,
        call_state::CallState,
        negotiation_step::NegotiationStep,
    },
    relay::{CandidateRelay, InMemoryRelay},
    sink_debug, sink_error, sink_info, sink_warn,
};

type StepHook = Arc<dyn Fn(NegotiationStep) + Send + Sync>;

/// Endpoints and wiring built so far, torn down together on failure.
struct Attempt {
    stream: Arc<MediaStream>,
    a: Option<Arc<ConnectionEndpoint>>,
    b: Option<Arc<ConnectionEndpoint>>,
    relay: Option<Arc<dyn CandidateRelay>>,
}

/// Drives one offer/answer round between two fresh endpoints and hands
/// back a [`Call`] once the chat channel is open on both sides.
pub struct CallOrchestrator {
    config: CallConfig,
    source: Arc<dyn MediaSource>,
    logger: Arc<dyn LogSink>,
    network: Arc<LoopbackNetwork>,
    step_hook: Option<StepHook>,
    abort: AbortHandle,
    state: Arc<Mutex<CallState>>,
    events_tx: UnboundedSender<CallEvent>,
    events_rx: Option<UnboundedReceiver<CallEvent>>,
}

impl CallOrchestrator {
    pub fn new(config: CallConfig, source: Arc<dyn MediaSource>, logger: Arc<dyn LogSink>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            source,
            logger,
            network: LoopbackNetwork::new(),
            step_hook: None,
            abort: AbortHandle::new(),
            state: Arc::new(Mutex::new(CallState::Idle)),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Runs the call over an existing fabric instead of a private one.
    #[must_use]
    pub fn with_network(mut self, network: Arc<LoopbackNetwork>) -> Self {
        self.network = network;
        self
    }

    /// Called synchronously after each step completes.
    #[must_use]
    pub fn with_step_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(NegotiationStep) + Send + Sync + 'static,
    {
        self.step_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    #[must_use]
    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }

    /// Takes the call-level event stream. Only the first call returns it.
    pub fn take_events(&mut self) -> Option<UnboundedReceiver<CallEvent>> {
        self.events_rx.take()
    }

    #[must_use]
    pub fn state(&self) -> CallState {
        self.state.lock().map(|s| *s).unwrap_or(CallState::Failed)
    }

    /// Acquires media, negotiates and waits for the chat channel to open.
    ///
    /// Any failure after acquisition puts both endpoints in `Failed`, closes
    /// the channel and releases the stream before the error is returned.
    ///
    /// # Errors
    /// [`CallError::Media`] when acquisition fails (no endpoint is created),
    /// [`CallError::NegotiationFailed`], [`CallError::Aborted`],
    /// [`CallError::TimedOut`] or [`CallError::ChannelNeverOpened`] otherwise.
    pub async fn start(&self) -> Result<Call, CallError> {
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        self.set_state(CallState::Acquiring);

        let constraints = self.config.constraints;
        let stream = match self
            .run_step(NegotiationStep::AcquireMedia, deadline, async {
                self.source.acquire(constraints).await.map_err(CallError::from)
            })
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                sink_warn!(self.logger, "[CALL] {}", e);
                self.set_state(CallState::Failed);
                let _ = self.events_tx.send(CallEvent::Failed(e.to_string()));
                return Err(e);
            }
        };
        sink_info!(
            self.logger,
            "[CALL] acquired stream {} with {} track(s)",
            stream.id(),
            stream.tracks().len()
        );

        self.set_state(CallState::Negotiating);
        let mut attempt = Attempt {
            stream,
            a: None,
            b: None,
            relay: None,
        };
        match self.negotiate(&mut attempt, deadline).await {
            Ok(call) => {
                self.set_state(CallState::Connected);
                sink_info!(self.logger, "[CALL] connected");
                Ok(call)
            }
            Err(e) => {
                sink_error!(self.logger, "[CALL] {}", e);
                self.tear_down(attempt, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn negotiate(
        &self,
        attempt: &mut Attempt,
        deadline: Option<Instant>,
    ) -> Result<Call, CallError> {
        use NegotiationStep as S;

        let (a, b, a_events, b_events) = self
            .run_step(S::CreateEndpoints, deadline, async {
                let component = self.config.ice_component;
                let (a, a_events) = ConnectionEndpoint::new(
                    EndpointId::A,
                    Arc::clone(&self.network),
                    component,
                    Arc::clone(&self.logger),
                );
                let (b, b_events) = ConnectionEndpoint::new(
                    EndpointId::B,
                    Arc::clone(&self.network),
                    component,
                    Arc::clone(&self.logger),
                );
                let (a, b) = (Arc::new(a), Arc::new(b));
                // Recorded inside the step so an abort after it still tears them down.
                attempt.a = Some(Arc::clone(&a));
                attempt.b = Some(Arc::clone(&b));
                Ok((a, b, a_events, b_events))
            })
            .await?;

        let (relay, mut incoming_a, mut incoming_b) = self
            .run_step(S::WireCandidates, deadline, async {
                let relay: Arc<dyn CandidateRelay> = Arc::new(InMemoryRelay::new(
                    Arc::clone(&a),
                    Arc::clone(&b),
                    Arc::clone(&self.logger),
                ));
                // The pumps keep the relay alive, so only an explicit close stops it.
                attempt.relay = Some(Arc::clone(&relay));
                let incoming_a = self.spawn_pump(EndpointId::A, a_events, Arc::clone(&relay));
                let incoming_b = self.spawn_pump(EndpointId::B, b_events, Arc::clone(&relay));
                Ok((relay, incoming_a, incoming_b))
            })
            .await?;

        let stream = Arc::clone(&attempt.stream);
        self.run_step(S::AttachTracks, deadline, async {
            for track in stream.tracks() {
                a.attach_track(Arc::clone(track), stream.id())
                    .await
                    .map_err(|e| CallError::negotiation(S::AttachTracks, e))?;
                b.attach_track(Arc::clone(track), stream.id())
                    .await
                    .map_err(|e| CallError::negotiation(S::AttachTracks, e))?;
            }
            Ok(())
        })
        .await?;

        let (local_channel, local_events) = self
            .run_step(S::CreateDataChannel, deadline, async {
                a.create_data_channel(&self.config.chat_label)
                    .await
                    .map_err(|e| CallError::negotiation(S::CreateDataChannel, e))
            })
            .await?;

        let offer = self
            .run_step(S::CreateOffer, deadline, async {
                a.create_offer()
                    .await
                    .map_err(|e| CallError::negotiation(S::CreateOffer, e))
            })
            .await?;
        self.run_step(S::ApplyLocalOffer, deadline, async {
            a.apply_local_description(offer.clone())
                .await
                .map_err(|e| CallError::negotiation(S::ApplyLocalOffer, e))
        })
        .await?;
        self.run_step(S::ApplyRemoteOffer, deadline, async {
            b.apply_remote_description(offer)
                .await
                .map_err(|e| CallError::negotiation(S::ApplyRemoteOffer, e))
        })
        .await?;

        let answer = self
            .run_step(S::CreateAnswer, deadline, async {
                b.create_answer()
                    .await
                    .map_err(|e| CallError::negotiation(S::CreateAnswer, e))
            })
            .await?;
        self.run_step(S::ApplyLocalAnswer, deadline, async {
            b.apply_local_description(answer.clone())
                .await
                .map_err(|e| CallError::negotiation(S::ApplyLocalAnswer, e))
        })
        .await?;
        self.run_step(S::ApplyRemoteAnswer, deadline, async {
            a.apply_remote_description(answer)
                .await
                .map_err(|e| CallError::negotiation(S::ApplyRemoteAnswer, e))
        })
        .await?;

        let (remote_channel, remote_events) = self
            .run_step(S::OpenDataChannel, deadline, async {
                local_channel
                    .wait_open()
                    .await
                    .map_err(|_| CallError::ChannelNeverOpened)?;
                loop {
                    let (channel, events) = incoming_b
                        .recv()
                        .await
                        .ok_or(CallError::ChannelNeverOpened)?;
                    if channel.label() == local_channel.label() {
                        break Ok((channel, events));
                    }
                    sink_debug!(self.logger, "[CALL] skipping channel '{}'", channel.label());
                }
            })
            .await?;

        // Drain anything A received meanwhile so `accept_channel` starts clean.
        while incoming_a.try_recv().is_ok() {}

        Ok(Call {
            stream: Arc::clone(&attempt.stream),
            a,
            b,
            relay,
            local: ChannelSide {
                channel: local_channel,
                events: Some(local_events),
            },
            remote: ChannelSide {
                channel: remote_channel,
                events: Some(remote_events),
            },
            incoming_a,
            incoming_b,
            state: Arc::clone(&self.state),
            logger: Arc::clone(&self.logger),
            ended: false,
        })
    }

    /// Runs one step raced against abort and the deadline, then reports it
    /// to the hook and re-checks abort.
    async fn run_step<T, F>(
        &self,
        step: NegotiationStep,
        deadline: Option<Instant>,
        fut: F,
    ) -> Result<T, CallError>
    where
        F: Future<Output = Result<T, CallError>>,
    {
        if self.abort.is_aborted() {
            return Err(CallError::Aborted { step });
        }
        sink_debug!(self.logger, "[CALL] step: {}", step);

        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        let out = tokio::select! {
            biased;
            () = self.abort.aborted() => return Err(CallError::Aborted { step }),
            () = expired => return Err(CallError::TimedOut { step }),
            out = fut => out?,
        };

        let _ = self.events_tx.send(CallEvent::Step(step));
        if let Some(hook) = &self.step_hook {
            hook(step);
        }
        if self.abort.is_aborted() {
            return Err(CallError::Aborted { step });
        }
        Ok(out)
    }

    /// Forwards one endpoint's events: candidates into the relay, channels
    /// to the returned receiver, the rest to the call event stream.
    fn spawn_pump(
        &self,
        id: EndpointId,
        mut events: UnboundedReceiver<EndpointEvent>,
        relay: Arc<dyn CandidateRelay>,
    ) -> UnboundedReceiver<IncomingChannel> {
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        let call_events = self.events_tx.clone();
        let logger = Arc::clone(&self.logger);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    EndpointEvent::CandidateGenerated(c) => {
                        if let Err(e) = relay.relay(id, c) {
                            sink_debug!(logger, "[CALL] candidate from {} not relayed: {}", id, e);
                        }
                    }
                    EndpointEvent::TrackReceived(track) => {
                        let _ = call_events.send(CallEvent::TrackReceived {
                            endpoint: id,
                            track,
                        });
                    }
                    EndpointEvent::ConnectivityStateChanged(state) => {
                        let _ = call_events.send(CallEvent::Connectivity {
                            endpoint: id,
                            state,
                        });
                    }
                    EndpointEvent::SignalingStateChanged(state) => {
                        let _ = call_events.send(CallEvent::Signaling {
                            endpoint: id,
                            state,
                        });
                    }
                    EndpointEvent::DataChannel(channel) => {
                        let _ = channel_tx.send(channel);
                    }
                }
            }
        });
        channel_rx
    }

    /// Fail-stop: both endpoints to `Failed`, relay closed, stream released.
    async fn tear_down(&self, attempt: Attempt, reason: &str) {
        if let Some(a) = &attempt.a {
            a.fail(reason).await;
        }
        if let Some(b) = &attempt.b {
            b.fail(reason).await;
        }
        if let Some(relay) = &attempt.relay {
            relay.close();
        }
        attempt.stream.release();
        self.set_state(CallState::Failed);
        let _ = self.events_tx.send(CallEvent::Failed(reason.to_owned()));
    }

    fn set_state(&self, next: CallState) {
        if let Ok(mut s) = self.state.lock() {
            if *s != next {
                sink_debug!(self.logger, "[CALL] state {} -> {}", *s, next);
                *s = next;
            }
        }
    }
}
