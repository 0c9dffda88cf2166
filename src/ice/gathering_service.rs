use std::sync::Arc;

use crate::ice::{
    candidate::Candidate,
    loopback_network::{LoopbackNetwork, NetworkError, VirtualSocket},
};

const TRANSPORT_UDP: &str = "udp";

/// Binds one socket on the loopback fabric and describes it as a host candidate.
///
/// # Errors
/// Propagates [`NetworkError`] from the bind.
pub fn gather_host_candidate(
    network: &Arc<LoopbackNetwork>,
    component: u8,
) -> Result<(VirtualSocket, Candidate), NetworkError> {
    let socket = network.bind()?;
    let candidate = Candidate::host(socket.local_addr(), TRANSPORT_UDP, component);
    Ok((socket, candidate))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::ice::candidate_type::CandidateType;

    #[test]
    fn host_candidate_matches_socket() {
        let net = LoopbackNetwork::new();
        let (sock, cand) = gather_host_candidate(&net, 1).unwrap();
        assert_eq!(cand.address, sock.local_addr());
        assert_eq!(cand.cand_type, CandidateType::Host);
        assert!(net.is_reachable(cand.address));
    }
}
