//! One side of the simulated call: the offer/answer state machine, candidate
//! buffering, connectivity and the data channels riding on it.
pub mod connection_endpoint;
pub mod endpoint_error;
pub mod endpoint_event;
pub mod endpoint_id;
pub mod remote_track;
pub mod signaling_state;

pub use connection_endpoint::ConnectionEndpoint;
pub use endpoint_error::EndpointError;
pub use endpoint_event::EndpointEvent;
pub use endpoint_id::EndpointId;
pub use remote_track::RemoteTrack;
pub use signaling_state::SignalingState;
