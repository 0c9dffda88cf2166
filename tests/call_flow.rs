#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use loopcall::{
    chat::{ChatFacade, ChatLine, ChatOrigin},
    data_channel::{ChannelError, ChannelEvent, ChannelState},
    endpoint::{ConnectionEndpoint, EndpointError, EndpointId, SignalingState},
    ice::{ConnectivityState, IceCandidate, LoopbackNetwork, candidate::Candidate},
    log::{LogLevel, LogSink, MemoryLogSink, NoopLogSink},
    media::{MediaConstraints, MediaError, SyntheticMediaSource, TrackKind},
    orchestrator::{
        CallConfig, CallError, CallEvent, CallOrchestrator, CallState, NegotiationStep,
    },
    sensor::{SensorLink, SensorMessage},
};
use serde_json::json;
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

const WAIT: Duration = Duration::from_secs(2);

fn logger() -> Arc<dyn LogSink> {
    Arc::new(NoopLogSink)
}

fn orchestrator(source: &Arc<SyntheticMediaSource>) -> CallOrchestrator {
    CallOrchestrator::new(CallConfig::default(), Arc::clone(source) as _, logger())
}

async fn next_event(rx: &mut UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("event within deadline")
        .expect("channel events still open")
}

/// The answerer may nominate a moment after the offerer's channel opens.
async fn wait_connected(ep: &ConnectionEndpoint) {
    timeout(WAIT, async {
        while ep.connectivity_state().await != ConnectivityState::Connected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("endpoint connected");
}

#[tokio::test]
async fn full_exchange_opens_the_channel_on_both_sides() {
    let source = Arc::new(SyntheticMediaSource::new());
    let mut orch = orchestrator(&source);
    let mut events = orch.take_events().unwrap();

    let mut call = orch.start().await.unwrap();
    assert_eq!(call.state(), CallState::Connected);
    assert_eq!(orch.state(), CallState::Connected);
    assert_eq!(call.channel(EndpointId::A).state(), ChannelState::Open);
    assert_eq!(call.channel(EndpointId::B).state(), ChannelState::Open);
    assert_eq!(call.channel(EndpointId::B).label(), "chat");

    for id in [EndpointId::A, EndpointId::B] {
        let ep = call.endpoint(id);
        assert_eq!(ep.signaling_state().await, SignalingState::Stable);
        wait_connected(ep).await;
        assert!(ep.nominated_pair().await.is_some());
    }
    assert_eq!(source.live_captures(), 2);

    let mut steps = Vec::new();
    let mut tracks = 0;
    // Steps are queued synchronously; track events come through the pumps.
    while tracks < 4 || steps.last() != Some(&NegotiationStep::OpenDataChannel) {
        match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            CallEvent::Step(step) => steps.push(step),
            CallEvent::TrackReceived { .. } => tracks += 1,
            _ => {}
        }
    }
    assert_eq!(steps.first(), Some(&NegotiationStep::AcquireMedia));
    assert_eq!(steps.last(), Some(&NegotiationStep::OpenDataChannel));
    let offer = steps.iter().position(|s| *s == NegotiationStep::CreateOffer).unwrap();
    let answer = steps.iter().position(|s| *s == NegotiationStep::CreateAnswer).unwrap();
    assert!(offer < answer);
    // Audio and video are announced to each side.
    assert_eq!(tracks, 4);

    call.hang_up().await;
    assert_eq!(call.state(), CallState::Ended);
    assert_eq!(source.live_captures(), 0);
    assert_eq!(
        call.endpoint(EndpointId::A).signaling_state().await,
        SignalingState::Closed
    );
}

#[tokio::test]
async fn messages_arrive_once_and_in_order() {
    let source = Arc::new(SyntheticMediaSource::new());
    let mut call = orchestrator(&source).start().await.unwrap();
    let mut b_events = call.take_channel_events(EndpointId::B).unwrap();
    assert_eq!(next_event(&mut b_events).await, ChannelEvent::Opened);

    let a = call.channel(EndpointId::A).clone();
    a.send("hello").unwrap();
    a.send("world").unwrap();

    assert_eq!(next_event(&mut b_events).await, ChannelEvent::Message("hello".into()));
    assert_eq!(next_event(&mut b_events).await, ChannelEvent::Message("world".into()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(b_events.try_recv().is_err());
}

#[tokio::test]
async fn missing_camera_creates_no_endpoint() {
    let source = Arc::new(SyntheticMediaSource::new());
    source.set_camera_present(false);
    let mut orch = orchestrator(&source);
    let mut events = orch.take_events().unwrap();

    let err = orch.start().await.err().unwrap();
    assert!(matches!(err, CallError::Media(MediaError::DeviceUnavailable(_))));
    assert_eq!(orch.state(), CallState::Failed);
    assert_eq!(source.live_captures(), 0);

    let mut saw_failed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            CallEvent::Step(step) => assert_ne!(step, NegotiationStep::CreateEndpoints),
            CallEvent::Signaling { .. } | CallEvent::Connectivity { .. } => {
                panic!("no endpoint should exist")
            }
            CallEvent::Failed(reason) => {
                assert!(reason.contains("camera"));
                saw_failed = true;
            }
            CallEvent::TrackReceived { .. } => panic!("no endpoint should exist"),
        }
    }
    assert!(saw_failed);
}

#[tokio::test]
async fn denied_permission_is_reported() {
    let source = Arc::new(SyntheticMediaSource::new());
    source.set_permission_granted(false);
    let err = orchestrator(&source).start().await.err().unwrap();
    assert!(matches!(err, CallError::Media(MediaError::PermissionDenied(_))));
}

#[tokio::test]
async fn abort_after_offer_fails_both_endpoints() {
    let source = Arc::new(SyntheticMediaSource::new());
    let orch = orchestrator(&source);
    let handle = orch.abort_handle();
    let mut orch = orch.with_step_hook(move |step| {
        if step == NegotiationStep::CreateOffer {
            handle.abort();
        }
    });
    let mut events = orch.take_events().unwrap();

    let err = orch.start().await.err().unwrap();
    assert!(matches!(
        err,
        CallError::Aborted {
            step: NegotiationStep::CreateOffer
        }
    ));
    assert_eq!(orch.state(), CallState::Failed);
    assert_eq!(source.live_captures(), 0);

    let mut failed = Vec::new();
    let mut saw_call_failed = false;
    while failed.len() < 2 || !saw_call_failed {
        let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        match event {
            CallEvent::Signaling {
                endpoint,
                state: SignalingState::Failed,
            } => failed.push(endpoint),
            CallEvent::Signaling { state, .. } => assert_ne!(state, SignalingState::Stable),
            CallEvent::Step(step) => assert_ne!(step, NegotiationStep::ApplyRemoteAnswer),
            CallEvent::Failed(_) => saw_call_failed = true,
            _ => {}
        }
    }
    failed.sort_by_key(|id| *id == EndpointId::B);
    assert_eq!(failed, vec![EndpointId::A, EndpointId::B]);
}

/// Waits until every task spawned by the test has finished.
async fn wait_for_no_tasks() {
    let handle = tokio::runtime::Handle::current();
    timeout(WAIT, async {
        while handle.metrics().num_alive_tasks() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("spawned tasks finished");
}

#[tokio::test]
async fn abort_at_any_step_leaves_nothing_behind() {
    for at in NegotiationStep::ALL {
        let source = Arc::new(SyntheticMediaSource::new());
        let sink = Arc::new(MemoryLogSink::new());
        let orch = CallOrchestrator::new(
            CallConfig::default(),
            Arc::clone(&source) as _,
            Arc::clone(&sink) as _,
        );
        let handle = orch.abort_handle();
        let mut orch = orch.with_step_hook(move |step| {
            if step == at {
                handle.abort();
            }
        });
        let mut events = orch.take_events().unwrap();

        let err = orch.start().await.err().unwrap();
        assert!(matches!(err, CallError::Aborted { step } if step == at), "{at}: {err}");
        assert_eq!(orch.state(), CallState::Failed, "{at}");
        assert_eq!(source.live_captures(), 0, "{at}");
        assert_eq!(orch.network().bound_count(), 0, "{at}");
        wait_for_no_tasks().await;

        let endpoints_exist = at >= NegotiationStep::CreateEndpoints;
        for id in ["A", "B"] {
            assert_eq!(
                sink.contains(LogLevel::Warn, &format!("[EP {id}] failed")),
                endpoints_exist,
                "{at}: endpoint {id}"
            );
        }

        // Once the pumps run, both failures reach the call event stream.
        let mut failed = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let CallEvent::Signaling {
                endpoint,
                state: SignalingState::Failed,
            } = event
            {
                failed.push(endpoint);
            }
        }
        if at >= NegotiationStep::WireCandidates {
            failed.sort_by_key(|id| *id == EndpointId::B);
            assert_eq!(failed, vec![EndpointId::A, EndpointId::B], "{at}");
        }

        let lines = sink.lines();
        let count = |needle: &str| lines.iter().filter(|(_, l)| l.contains(needle)).count();
        // A channel that never opened still logs its close.
        assert!(count("'chat' open") <= count("'chat' closed"), "{at}: channel left open");
    }
}

#[tokio::test]
async fn slow_acquisition_times_out() {
    let source = Arc::new(SyntheticMediaSource::new().with_open_delay(Duration::from_millis(300)));
    let config = CallConfig {
        timeout: Some(Duration::from_millis(50)),
        ..CallConfig::default()
    };
    let orch = CallOrchestrator::new(config, Arc::clone(&source) as _, logger());
    let err = orch.start().await.err().unwrap();
    assert!(matches!(
        err,
        CallError::TimedOut {
            step: NegotiationStep::AcquireMedia
        }
    ));
    assert_eq!(orch.state(), CallState::Failed);
    assert_eq!(source.live_captures(), 0);
}

#[tokio::test]
async fn audio_only_call_announces_one_track() {
    let source = Arc::new(SyntheticMediaSource::new());
    source.set_camera_present(false);
    let config = CallConfig {
        constraints: MediaConstraints {
            video: false,
            audio: true,
        },
        ..CallConfig::default()
    };
    let mut orch = CallOrchestrator::new(config, Arc::clone(&source) as _, logger());
    let mut events = orch.take_events().unwrap();
    let call = orch.start().await.unwrap();
    assert_eq!(call.stream().tracks().len(), 1);

    let mut tracks = Vec::new();
    while tracks.len() < 2 {
        if let CallEvent::TrackReceived { endpoint, track } =
            timeout(WAIT, events.recv()).await.unwrap().unwrap()
        {
            tracks.push((endpoint, track.kind));
        }
    }
    assert!(tracks.iter().all(|(_, k)| *k == TrackKind::Audio));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!matches!(events.try_recv(), Ok(CallEvent::TrackReceived { .. })));
}

#[tokio::test]
async fn candidates_before_remote_description_are_applied_in_order() {
    let network = LoopbackNetwork::new();
    let (a, _a_events) = ConnectionEndpoint::new(EndpointId::A, Arc::clone(&network), 1, logger());
    let (b, _b_events) = ConnectionEndpoint::new(EndpointId::B, Arc::clone(&network), 1, logger());

    let ports = [41000u16, 41002, 41001];
    for port in ports {
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let candidate = Candidate::host(addr, "udp", 1);
        b.add_candidate(IceCandidate::from_candidate(&candidate, Some("0".into()), 0))
            .await;
    }
    b.add_candidate(IceCandidate::new("candidate:garbage", Some("0".into()), 0))
        .await;
    assert_eq!(b.pending_candidates().await, 4);
    assert!(b.remote_candidates().await.is_empty());

    a.create_data_channel("chat").await.unwrap();
    let offer = a.create_offer().await.unwrap();
    b.apply_remote_description(offer).await.unwrap();

    assert_eq!(b.pending_candidates().await, 0);
    let applied: Vec<u16> = b
        .remote_candidates()
        .await
        .iter()
        .map(|c| c.address.port())
        .collect();
    assert_eq!(applied, ports.to_vec());
}

#[tokio::test]
async fn second_remote_description_is_rejected() {
    let network = LoopbackNetwork::new();
    let (a, _a_events) = ConnectionEndpoint::new(EndpointId::A, Arc::clone(&network), 1, logger());
    let (b, _b_events) = ConnectionEndpoint::new(EndpointId::B, network, 1, logger());

    a.create_data_channel("chat").await.unwrap();
    let offer = a.create_offer().await.unwrap();
    b.apply_remote_description(offer.clone()).await.unwrap();

    let err = b.apply_remote_description(offer).await.unwrap_err();
    assert!(matches!(
        err,
        EndpointError::InvalidState {
            state: SignalingState::HaveRemoteOffer,
            ..
        }
    ));
    assert_eq!(b.signaling_state().await, SignalingState::HaveRemoteOffer);
}

#[tokio::test]
async fn sending_outside_open_is_refused() {
    let network = LoopbackNetwork::new();
    let (a, _a_events) = ConnectionEndpoint::new(EndpointId::A, network, 1, logger());
    let (channel, _events) = a.create_data_channel("chat").await.unwrap();

    assert_eq!(channel.state(), ChannelState::Connecting);
    assert!(matches!(
        channel.send("early"),
        Err(ChannelError::ChannelNotOpen {
            state: ChannelState::Connecting
        })
    ));

    a.close().await;
    assert_eq!(channel.state(), ChannelState::Closed);
    assert!(matches!(
        channel.send("late"),
        Err(ChannelError::ChannelNotOpen {
            state: ChannelState::Closed
        })
    ));
}

#[tokio::test]
async fn hang_up_closes_the_peer_channel() {
    let source = Arc::new(SyntheticMediaSource::new());
    let mut call = orchestrator(&source).start().await.unwrap();
    let mut b_events = call.take_channel_events(EndpointId::B).unwrap();
    assert_eq!(next_event(&mut b_events).await, ChannelEvent::Opened);

    call.hang_up().await;
    assert_eq!(next_event(&mut b_events).await, ChannelEvent::Closed);
    assert_eq!(call.channel(EndpointId::B).state(), ChannelState::Closed);

    // Idempotent.
    call.hang_up().await;
    assert_eq!(source.live_captures(), 0);
}

#[tokio::test]
async fn chat_facades_exchange_lines() {
    let source = Arc::new(SyntheticMediaSource::new());
    let mut call = orchestrator(&source).start().await.unwrap();
    let mut a_events = call.take_channel_events(EndpointId::A).unwrap();
    let mut b_events = call.take_channel_events(EndpointId::B).unwrap();

    let mut chat_a = ChatFacade::new(call.channel(EndpointId::A).clone(), logger());
    let mut chat_b = ChatFacade::new(call.channel(EndpointId::B).clone(), logger());
    chat_a.drain(&mut a_events);
    let opened = next_event(&mut b_events).await;
    chat_b.handle_event(opened);
    assert!(chat_a.input_enabled());
    assert!(chat_b.input_enabled());

    assert!(chat_a.submit("hi there").unwrap());
    let received = next_event(&mut b_events).await;
    let line = chat_b.handle_event(received).cloned().unwrap();
    match line {
        ChatLine::Message(msg) => {
            assert_eq!(msg.text, "hi there");
            assert_eq!(msg.origin, ChatOrigin::Remote);
        }
        ChatLine::System(s) => panic!("unexpected system line {s}"),
    }
    assert_eq!(
        chat_a.render(),
        "--- Connection established! ---\nMe: hi there"
    );
    assert_eq!(
        chat_b.render(),
        "--- Connection established! ---\nFriend: hi there"
    );

    call.hang_up().await;
    let closed = next_event(&mut b_events).await;
    chat_b.handle_event(closed);
    assert!(!chat_b.input_enabled());
    assert!(chat_b.render().ends_with("--- Connection lost. ---"));
}

#[tokio::test]
async fn sensor_records_cross_the_channel() {
    let source = Arc::new(SyntheticMediaSource::new());
    let mut call = orchestrator(&source).start().await.unwrap();
    let a_events = call.take_channel_events(EndpointId::A).unwrap();
    let mut b_events = call.take_channel_events(EndpointId::B).unwrap();
    assert_eq!(next_event(&mut b_events).await, ChannelEvent::Opened);

    let sensor = SensorLink::new(call.channel(EndpointId::A).clone(), a_events, logger());
    let mut game = SensorLink::new(call.channel(EndpointId::B).clone(), b_events, logger());

    let register = SensorMessage::Register {
        role: "sensor".into(),
    };
    let reading = SensorMessage::SensorData {
        role: "sensor".into(),
        payload: json!({"alpha": 12.5, "beta": -3.0}),
    };
    sensor.send(&register).unwrap();
    sensor.send(&reading).unwrap();

    let first = timeout(WAIT, game.recv()).await.unwrap().unwrap().unwrap();
    let second = timeout(WAIT, game.recv()).await.unwrap().unwrap().unwrap();
    assert_eq!(first, register);
    assert_eq!(second, reading);
    assert_eq!(second.role(), "sensor");

    call.channel(EndpointId::A).send("not json").unwrap();
    assert!(timeout(WAIT, game.recv()).await.unwrap().unwrap().is_err());
}

#[tokio::test]
async fn negotiation_is_logged() {
    let source = Arc::new(SyntheticMediaSource::new());
    let sink = Arc::new(MemoryLogSink::new());
    let logs = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&logs);
    let orch = CallOrchestrator::new(CallConfig::default(), source as _, Arc::clone(&sink) as _)
        .with_step_hook(move |step| seen.lock().unwrap().push(step));
    let mut call = orch.start().await.unwrap();
    call.hang_up().await;

    assert!(sink.contains(LogLevel::Info, "[CALL] connected"));
    assert!(logs.lock().unwrap().contains(&NegotiationStep::OpenDataChannel));
}
