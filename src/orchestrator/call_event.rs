use crate::{
    endpoint::{EndpointId, RemoteTrack, SignalingState},
    ice::ConnectivityState,
    orchestrator::negotiation_step::NegotiationStep,
};

/// Progress reported while a call is set up and while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Step(NegotiationStep),
    TrackReceived {
        endpoint: EndpointId,
        track: RemoteTrack,
    },
    Connectivity {
        endpoint: EndpointId,
        state: ConnectivityState,
    },
    Signaling {
        endpoint: EndpointId,
        state: SignalingState,
    },
    Failed(String),
}
