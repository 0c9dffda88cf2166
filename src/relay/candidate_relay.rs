use crate::{endpoint::EndpointId, ice::IceCandidate, relay::relay_error::RelayError};

/// Carries trickled candidates from one endpoint to the other.
///
/// Implementations must preserve order per direction and never drop a
/// candidate while open. The in-process relay is one implementation; a
/// signaling transport can stand in without touching the endpoints.
pub trait CandidateRelay: Send + Sync {
    /// Queues `candidate`, produced by `from`, for the peer.
    ///
    /// # Errors
    /// [`RelayError::Closed`] once the relay has been shut down.
    fn relay(&self, from: EndpointId, candidate: IceCandidate) -> Result<(), RelayError>;

    /// Stops forwarding. Queued candidates are discarded.
    fn close(&self);
}
