use thiserror::Error;

use crate::{endpoint::signaling_state::SignalingState, ice::loopback_network::NetworkError, sdp::SdpError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("{op} is not valid in state {state}")]
    InvalidState {
        op: &'static str,
        state: SignalingState,
    },
    #[error("session description rejected: {0}")]
    Sdp(#[from] SdpError),
    #[error("network: {0}")]
    Network(#[from] NetworkError),
    #[error("endpoint is closed")]
    Closed,
}
