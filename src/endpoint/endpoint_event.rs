use crate::{
    data_channel::channel_registry::IncomingChannel,
    endpoint::{remote_track::RemoteTrack, signaling_state::SignalingState},
    ice::{ConnectivityState, IceCandidate},
};

/// Everything an endpoint reports to whoever drives it.
#[derive(Debug)]
pub enum EndpointEvent {
    CandidateGenerated(IceCandidate),
    TrackReceived(RemoteTrack),
    ConnectivityStateChanged(ConnectivityState),
    SignalingStateChanged(SignalingState),
    /// The peer opened a channel; it arrives already open.
    DataChannel(IncomingChannel),
}
